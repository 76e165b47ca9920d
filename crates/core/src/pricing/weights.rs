use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;

/// Coefficients for the two pricing stages.
///
/// Every field is a plain coefficient; no sign constraint is enforced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingWeights {
    pub peso_urgenza: Decimal,
    pub peso_complessita: Decimal,
    pub peso_cliente_abituale: Decimal,
    pub peso_volume_lavoro: Decimal,
    pub moltiplicatore_arrotondamento: Decimal,
    pub moltiplicatore_base: Decimal,
    pub peso_prosperita_economica: Decimal,
    pub peso_importanza: Decimal,
}

impl Default for PricingWeights {
    fn default() -> Self {
        Self {
            peso_urgenza: Decimal::new(10, 2),
            peso_complessita: Decimal::new(15, 2),
            peso_cliente_abituale: Decimal::new(5, 2),
            peso_volume_lavoro: Decimal::new(8, 2),
            moltiplicatore_arrotondamento: Decimal::new(1, 2),
            moltiplicatore_base: Decimal::ONE_HUNDRED,
            peso_prosperita_economica: Decimal::new(6, 2),
            peso_importanza: Decimal::new(4, 2),
        }
    }
}

impl PricingWeights {
    /// Effective weights for a stored (possibly absent) configuration.
    pub fn resolve(patch: Option<&PricingWeightsPatch>) -> Self {
        patch.map(merge_with_defaults).unwrap_or_default()
    }
}

/// Partial weights as stored in a configuration record or sent by a client.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingWeightsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peso_urgenza: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peso_complessita: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peso_cliente_abituale: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peso_volume_lavoro: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moltiplicatore_arrotondamento: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moltiplicatore_base: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peso_prosperita_economica: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peso_importanza: Option<Decimal>,
}

impl PricingWeightsPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A stored weights configuration. At most one record is active at a time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingWeightsRecord {
    pub id: String,
    pub label: String,
    pub weights: PricingWeightsPatch,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Fills every field the patch leaves unset from [`PricingWeights::default`].
pub fn merge_with_defaults(patch: &PricingWeightsPatch) -> PricingWeights {
    let defaults = PricingWeights::default();
    PricingWeights {
        peso_urgenza: patch.peso_urgenza.unwrap_or(defaults.peso_urgenza),
        peso_complessita: patch.peso_complessita.unwrap_or(defaults.peso_complessita),
        peso_cliente_abituale: patch
            .peso_cliente_abituale
            .unwrap_or(defaults.peso_cliente_abituale),
        peso_volume_lavoro: patch.peso_volume_lavoro.unwrap_or(defaults.peso_volume_lavoro),
        moltiplicatore_arrotondamento: patch
            .moltiplicatore_arrotondamento
            .unwrap_or(defaults.moltiplicatore_arrotondamento),
        moltiplicatore_base: patch.moltiplicatore_base.unwrap_or(defaults.moltiplicatore_base),
        peso_prosperita_economica: patch
            .peso_prosperita_economica
            .unwrap_or(defaults.peso_prosperita_economica),
        peso_importanza: patch.peso_importanza.unwrap_or(defaults.peso_importanza),
    }
}
