use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::params::ServiceParams;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId(pub String);

/// Catalog entry priced through the pricing engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub base_price: Decimal,
    pub params: ServiceParams,
    pub active: bool,
}
