pub mod clv;
pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;

pub use clv::{
    compute_customer_clv, distinct_customers, sort_valuations, ClvScope, ClvSort,
    CustomerClvResult,
};
pub use domain::customer::{Customer, CustomerId, CustomerRef, CustomerType};
pub use domain::project::{Project, ProjectId, ProjectStatus};
pub use domain::quote::{Quote, QuoteId, QuoteStatus};
pub use domain::service::{Service, ServiceId};
pub use domain::user::{CurrentUser, UserId, UserRole};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use pricing::{
    compute_effective_budget, compute_full_pricing, compute_internal_budget, PricingEngine,
    PricingError, PricingParams, PricingWeights, PricingWeightsPatch, PricingWeightsRecord, QuoteParams,
    ServiceParams, WeightedPricingEngine,
};
