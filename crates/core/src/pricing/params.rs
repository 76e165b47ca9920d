use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const PARAM_MIN: Decimal = Decimal::ZERO;
pub const PARAM_MAX: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
/// Midpoint of the 0..=5 scale, used for any categorical input left unset.
pub const PARAM_DEFAULT: Decimal = Decimal::TWO;

/// Bounds a categorical input to `0..=5`, substituting `default` when it is unset.
pub fn clamp_param(value: Option<Decimal>, default: Decimal) -> Decimal {
    match value {
        None => default,
        Some(value) if value < PARAM_MIN => PARAM_MIN,
        Some(value) if value > PARAM_MAX => PARAM_MAX,
        Some(value) => value,
    }
}

/// Categorical inputs that describe the service being sold.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceParams {
    pub urgenza: Option<Decimal>,
    pub complessita: Option<Decimal>,
    pub volume_lavoro: Option<Decimal>,
    pub importanza: Option<Decimal>,
}

/// Inputs that belong to the specific quote line.
///
/// The service fields repeated here override the catalog values when set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteParams {
    pub cliente_abituale: Option<Decimal>,
    pub prosperita_economica: Option<Decimal>,
    pub altri_costi: Option<Decimal>,
    pub urgenza: Option<Decimal>,
    pub complessita: Option<Decimal>,
    pub volume_lavoro: Option<Decimal>,
    pub importanza: Option<Decimal>,
}

/// Fully resolved inputs of one priced line plus the two derived budgets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingParams {
    pub prezzo_base: Decimal,
    pub urgenza: Decimal,
    pub complessita: Decimal,
    pub volume_lavoro: Decimal,
    pub importanza: Decimal,
    pub cliente_abituale: Decimal,
    pub prosperita_economica: Decimal,
    pub altri_costi: Decimal,
    pub budget_interno: Decimal,
    pub budget_effettivo: Decimal,
}

/// Clamped categorical inputs, before any formula runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ResolvedInputs {
    pub urgenza: Decimal,
    pub complessita: Decimal,
    pub volume_lavoro: Decimal,
    pub importanza: Decimal,
    pub cliente_abituale: Decimal,
    pub prosperita_economica: Decimal,
    pub altri_costi: Decimal,
}

impl ResolvedInputs {
    pub(crate) fn resolve(service: &ServiceParams, quote: &QuoteParams) -> Self {
        let pick = |line: Option<Decimal>, catalog: Option<Decimal>| {
            clamp_param(line.or(catalog), PARAM_DEFAULT)
        };

        Self {
            urgenza: pick(quote.urgenza, service.urgenza),
            complessita: pick(quote.complessita, service.complessita),
            volume_lavoro: pick(quote.volume_lavoro, service.volume_lavoro),
            importanza: pick(quote.importanza, service.importanza),
            cliente_abituale: clamp_param(quote.cliente_abituale, PARAM_DEFAULT),
            prosperita_economica: clamp_param(quote.prosperita_economica, PARAM_DEFAULT),
            altri_costi: quote.altri_costi.unwrap_or(Decimal::ZERO).max(Decimal::ZERO),
        }
    }
}
