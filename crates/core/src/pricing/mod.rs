pub mod engine;
pub mod params;
pub mod weights;

pub use engine::{
    compute_effective_budget, compute_full_pricing, compute_internal_budget, PricingEngine,
    PricingError, WeightedPricingEngine,
};
pub use params::{clamp_param, PricingParams, QuoteParams, ServiceParams, PARAM_DEFAULT};
pub use weights::{merge_with_defaults, PricingWeights, PricingWeightsPatch, PricingWeightsRecord};
