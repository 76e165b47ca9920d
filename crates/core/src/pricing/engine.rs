use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use super::params::{PricingParams, QuoteParams, ResolvedInputs, ServiceParams};
use super::weights::{PricingWeights, PricingWeightsPatch};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("pricing arithmetic overflowed while computing {stage}")]
    Overflow { stage: &'static str },
}

const INTERNAL_STAGE: &str = "budget_interno";
const EFFECTIVE_STAGE: &str = "budget_effettivo";

/// `base × (1 + u·wu) × (1 + c·wc) × (1 − a·wa) × (1 + v·wv)`, rounded to the cent.
pub fn compute_internal_budget(
    base_price: Decimal,
    urgenza: Decimal,
    complessita: Decimal,
    cliente_abituale: Decimal,
    volume_lavoro: Decimal,
    weights: &PricingWeights,
) -> Result<Decimal, PricingError> {
    let factors = [
        markup(urgenza, weights.peso_urgenza, INTERNAL_STAGE)?,
        markup(complessita, weights.peso_complessita, INTERNAL_STAGE)?,
        discount(cliente_abituale, weights.peso_cliente_abituale, INTERNAL_STAGE)?,
        markup(volume_lavoro, weights.peso_volume_lavoro, INTERNAL_STAGE)?,
    ];

    let raw = factors
        .into_iter()
        .try_fold(base_price, |acc, factor| multiply(acc, factor, INTERNAL_STAGE))?;
    Ok(round_to_cents(raw))
}

/// Quantizes `internal + altri_costi` into an integer bucket, scales it back to currency and
/// applies the prosperity and importance markups.
///
/// The bucket is taken before the markups so equal buckets always yield equal prices for the
/// same customer profile. Negative sums are not clamped.
pub fn compute_effective_budget(
    internal_budget: Decimal,
    altri_costi: Decimal,
    prosperita_economica: Decimal,
    importanza: Decimal,
    weights: &PricingWeights,
) -> Result<Decimal, PricingError> {
    let total = internal_budget
        .checked_add(altri_costi)
        .ok_or(PricingError::Overflow { stage: EFFECTIVE_STAGE })?;
    let bucket = round_half_up(multiply(
        total,
        weights.moltiplicatore_arrotondamento,
        EFFECTIVE_STAGE,
    )?)?;

    let raw = [
        weights.moltiplicatore_base,
        markup(prosperita_economica, weights.peso_prosperita_economica, EFFECTIVE_STAGE)?,
        markup(importanza, weights.peso_importanza, EFFECTIVE_STAGE)?,
    ]
    .into_iter()
    .try_fold(bucket, |acc, factor| multiply(acc, factor, EFFECTIVE_STAGE))?;
    Ok(round_to_cents(raw))
}

/// Defaults and clamps every input, merges `weights` over the defaults and chains both stages.
pub fn compute_full_pricing(
    base_price: Decimal,
    service_params: &ServiceParams,
    quote_params: &QuoteParams,
    weights: Option<&PricingWeightsPatch>,
) -> Result<PricingParams, PricingError> {
    price_with_weights(base_price, service_params, quote_params, &PricingWeights::resolve(weights))
}

fn price_with_weights(
    base_price: Decimal,
    service_params: &ServiceParams,
    quote_params: &QuoteParams,
    weights: &PricingWeights,
) -> Result<PricingParams, PricingError> {
    let inputs = ResolvedInputs::resolve(service_params, quote_params);

    let budget_interno = compute_internal_budget(
        base_price,
        inputs.urgenza,
        inputs.complessita,
        inputs.cliente_abituale,
        inputs.volume_lavoro,
        weights,
    )?;
    let budget_effettivo = compute_effective_budget(
        budget_interno,
        inputs.altri_costi,
        inputs.prosperita_economica,
        inputs.importanza,
        weights,
    )?;

    Ok(PricingParams {
        prezzo_base: base_price,
        urgenza: inputs.urgenza,
        complessita: inputs.complessita,
        volume_lavoro: inputs.volume_lavoro,
        importanza: inputs.importanza,
        cliente_abituale: inputs.cliente_abituale,
        prosperita_economica: inputs.prosperita_economica,
        altri_costi: inputs.altri_costi,
        budget_interno,
        budget_effettivo,
    })
}

pub trait PricingEngine: Send + Sync {
    fn price(
        &self,
        base_price: Decimal,
        service_params: &ServiceParams,
        quote_params: &QuoteParams,
    ) -> Result<PricingParams, PricingError>;
}

/// Pricing engine bound to one resolved weights record.
#[derive(Clone, Debug, Default)]
pub struct WeightedPricingEngine {
    weights: PricingWeights,
}

impl WeightedPricingEngine {
    pub fn new(weights: PricingWeights) -> Self {
        Self { weights }
    }
}

impl PricingEngine for WeightedPricingEngine {
    fn price(
        &self,
        base_price: Decimal,
        service_params: &ServiceParams,
        quote_params: &QuoteParams,
    ) -> Result<PricingParams, PricingError> {
        price_with_weights(base_price, service_params, quote_params, &self.weights)
    }
}

fn markup(value: Decimal, weight: Decimal, stage: &'static str) -> Result<Decimal, PricingError> {
    multiply(value, weight, stage)
        .and_then(|delta| Decimal::ONE.checked_add(delta).ok_or(PricingError::Overflow { stage }))
}

fn discount(value: Decimal, weight: Decimal, stage: &'static str) -> Result<Decimal, PricingError> {
    multiply(value, weight, stage)
        .and_then(|delta| Decimal::ONE.checked_sub(delta).ok_or(PricingError::Overflow { stage }))
}

fn multiply(left: Decimal, right: Decimal, stage: &'static str) -> Result<Decimal, PricingError> {
    left.checked_mul(right).ok_or(PricingError::Overflow { stage })
}

fn round_to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Nearest integer with halves going toward positive infinity (`-2.5` becomes `-2`).
fn round_half_up(value: Decimal) -> Result<Decimal, PricingError> {
    value
        .checked_add(Decimal::new(5, 1))
        .map(|shifted| shifted.floor())
        .ok_or(PricingError::Overflow { stage: EFFECTIVE_STAGE })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        compute_effective_budget, compute_full_pricing, compute_internal_budget, round_half_up,
        PricingEngine, PricingError, WeightedPricingEngine,
    };
    use crate::pricing::params::{QuoteParams, ServiceParams};
    use crate::pricing::weights::{PricingWeights, PricingWeightsPatch};

    fn dec(value: &str) -> Decimal {
        value.parse().expect("decimal literal")
    }

    fn scale() -> Vec<Decimal> {
        (0..=10).map(|step| Decimal::new(step * 5, 1)).collect()
    }

    #[test]
    fn zero_factors_collapse_to_identity() {
        let weights = PricingWeights::default();
        let budget = compute_internal_budget(
            dec("100"),
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            &weights,
        )
        .expect("internal budget");

        assert_eq!(budget, dec("100.00"));
    }

    #[test]
    fn zero_base_price_yields_zero() {
        let weights = PricingWeights::default();
        let five = Decimal::new(5, 0);
        let budget =
            compute_internal_budget(Decimal::ZERO, five, five, five, five, &weights).expect("zero");

        assert_eq!(budget, Decimal::ZERO);
    }

    #[test]
    fn internal_budget_matches_hand_computed_value() {
        let weights = PricingWeights::default();
        // 1000 × 1.2 × 1.45 × 0.95 × 1.08
        let budget = compute_internal_budget(
            dec("1000"),
            Decimal::TWO,
            Decimal::new(3, 0),
            Decimal::ONE,
            Decimal::ONE,
            &weights,
        )
        .expect("internal budget");

        assert_eq!(budget, dec("1785.24"));
    }

    #[test]
    fn internal_budget_rounds_half_cents_away_from_zero() {
        let weights = PricingWeights {
            peso_urgenza: dec("0.5"),
            ..PricingWeights::default()
        };
        // 0.01 × (1 + 1 × 0.5) = 0.015
        let positive = compute_internal_budget(
            dec("0.01"),
            Decimal::ONE,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            &weights,
        )
        .expect("positive");
        let negative = compute_internal_budget(
            dec("-0.01"),
            Decimal::ONE,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            &weights,
        )
        .expect("negative");

        assert_eq!(positive, dec("0.02"));
        assert_eq!(negative, dec("-0.02"));
    }

    #[test]
    fn internal_budget_is_monotonic_in_each_input() {
        let weights = PricingWeights::default();
        let base = dec("1250");
        let mid = Decimal::TWO;
        let values = scale();

        let by_urgenza: Vec<_> = values
            .iter()
            .map(|v| compute_internal_budget(base, *v, mid, mid, mid, &weights).expect("u"))
            .collect();
        let by_complessita: Vec<_> = values
            .iter()
            .map(|v| compute_internal_budget(base, mid, *v, mid, mid, &weights).expect("c"))
            .collect();
        let by_volume: Vec<_> = values
            .iter()
            .map(|v| compute_internal_budget(base, mid, mid, mid, *v, &weights).expect("v"))
            .collect();
        let by_loyalty: Vec<_> = values
            .iter()
            .map(|v| compute_internal_budget(base, mid, mid, *v, mid, &weights).expect("a"))
            .collect();

        for series in [&by_urgenza, &by_complessita, &by_volume] {
            assert!(series.windows(2).all(|pair| pair[0] <= pair[1]), "{series:?}");
        }
        assert!(by_loyalty.windows(2).all(|pair| pair[0] >= pair[1]), "{by_loyalty:?}");
    }

    #[test]
    fn effective_budget_quantizes_before_weighting() {
        let weights = PricingWeights::default();
        // round((1785.24 + 64.76) × 0.01) = round(18.5) = 19 → 1900 × 1.12 × 1.08
        let budget = compute_effective_budget(
            dec("1785.24"),
            dec("64.76"),
            Decimal::TWO,
            Decimal::TWO,
            &weights,
        )
        .expect("effective budget");

        assert_eq!(budget, dec("2298.24"));
    }

    #[test]
    fn effective_budget_without_markups_is_a_multiple_of_the_base_multiplier() {
        let weights = PricingWeights::default();
        for internal in ["0", "49.99", "50", "1785.24", "12345.67", "99999.99"] {
            let budget = compute_effective_budget(
                dec(internal),
                dec("12.5"),
                Decimal::ZERO,
                Decimal::ZERO,
                &weights,
            )
            .expect("effective budget");

            assert_eq!(budget % weights.moltiplicatore_base, Decimal::ZERO, "{internal}");
        }
    }

    #[test]
    fn negative_totals_round_and_propagate() {
        let weights = PricingWeights::default();
        let budget = compute_effective_budget(
            dec("-260"),
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            &weights,
        )
        .expect("negative effective budget");

        assert_eq!(budget, dec("-300.00"));
        assert_eq!(round_half_up(dec("-2.5")).expect("round"), dec("-2"));
        assert_eq!(round_half_up(dec("2.5")).expect("round"), dec("3"));
    }

    #[test]
    fn full_pricing_defaults_missing_inputs_to_midpoint() {
        let pricing = compute_full_pricing(
            dec("1000"),
            &ServiceParams::default(),
            &QuoteParams::default(),
            None,
        )
        .expect("full pricing");

        assert_eq!(pricing.urgenza, Decimal::TWO);
        assert_eq!(pricing.cliente_abituale, Decimal::TWO);
        assert_eq!(pricing.altri_costi, Decimal::ZERO);
        // 1000 × 1.2 × 1.3 × 0.9 × 1.16
        assert_eq!(pricing.budget_interno, dec("1628.64"));
        // round(16.2864) = 16 → 1600 × 1.12 × 1.08
        assert_eq!(pricing.budget_effettivo, dec("1935.36"));
    }

    #[test]
    fn full_pricing_applies_partial_weights_over_defaults() {
        let patch = PricingWeightsPatch {
            moltiplicatore_arrotondamento: Some(dec("0.1")),
            moltiplicatore_base: Some(dec("10")),
            ..PricingWeightsPatch::default()
        };
        let quote = QuoteParams {
            prosperita_economica: Some(Decimal::ZERO),
            importanza: Some(Decimal::ZERO),
            ..QuoteParams::default()
        };

        let pricing = compute_full_pricing(dec("1000"), &ServiceParams::default(), &quote, Some(&patch))
            .expect("full pricing");

        assert_eq!(pricing.budget_interno, dec("1628.64"));
        assert_eq!(pricing.budget_effettivo, dec("1630.00"));
    }

    #[test]
    fn full_pricing_is_deterministic() {
        let service = ServiceParams {
            urgenza: Some(dec("4.5")),
            complessita: Some(dec("1")),
            ..ServiceParams::default()
        };
        let quote = QuoteParams {
            cliente_abituale: Some(dec("5")),
            altri_costi: Some(dec("120.40")),
            ..QuoteParams::default()
        };

        let first = compute_full_pricing(dec("873.10"), &service, &quote, None).expect("first");
        let second = compute_full_pricing(dec("873.10"), &service, &quote, None).expect("second");

        assert_eq!(first, second);
        assert_eq!(first.budget_interno.to_string(), second.budget_interno.to_string());
    }

    #[test]
    fn overflow_is_reported_instead_of_panicking() {
        let weights = PricingWeights {
            peso_urgenza: Decimal::MAX,
            ..PricingWeights::default()
        };

        let error = compute_internal_budget(
            Decimal::MAX,
            Decimal::new(5, 0),
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            &weights,
        )
        .expect_err("overflow");

        assert_eq!(error, PricingError::Overflow { stage: "budget_interno" });
    }

    #[test]
    fn weighted_engine_uses_its_bound_weights() {
        let engine = WeightedPricingEngine::new(PricingWeights::resolve(Some(&PricingWeightsPatch {
            peso_urgenza: Some(Decimal::ZERO),
            peso_complessita: Some(Decimal::ZERO),
            peso_cliente_abituale: Some(Decimal::ZERO),
            peso_volume_lavoro: Some(Decimal::ZERO),
            ..PricingWeightsPatch::default()
        })));

        let pricing = engine
            .price(dec("640"), &ServiceParams::default(), &QuoteParams::default())
            .expect("price");

        assert_eq!(pricing.budget_interno, dec("640.00"));
    }
}
