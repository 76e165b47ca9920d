use std::sync::Arc;

use axum::extract::FromRef;
use valora_db::repositories::{
    CustomerRepository, PricingWeightsRepository, ProjectRepository, QuoteRepository,
    ServiceRepository, SqlCustomerRepository, SqlPricingWeightsRepository, SqlProjectRepository,
    SqlQuoteRepository, SqlServiceRepository,
};
use valora_db::DbPool;

use crate::identity::IdentityGate;

/// Shared handler state. Repositories are trait objects so tests can swap in the in-memory
/// implementations.
#[derive(Clone)]
pub struct AppState {
    pub quotes: Arc<dyn QuoteRepository>,
    pub customers: Arc<dyn CustomerRepository>,
    pub projects: Arc<dyn ProjectRepository>,
    pub services: Arc<dyn ServiceRepository>,
    pub weights: Arc<dyn PricingWeightsRepository>,
    pub identity: IdentityGate,
}

impl AppState {
    pub fn from_pool(db_pool: DbPool, identity: IdentityGate) -> Self {
        Self {
            quotes: Arc::new(SqlQuoteRepository::new(db_pool.clone())),
            customers: Arc::new(SqlCustomerRepository::new(db_pool.clone())),
            projects: Arc::new(SqlProjectRepository::new(db_pool.clone())),
            services: Arc::new(SqlServiceRepository::new(db_pool.clone())),
            weights: Arc::new(SqlPricingWeightsRepository::new(db_pool)),
            identity,
        }
    }
}

impl FromRef<AppState> for IdentityGate {
    fn from_ref(state: &AppState) -> Self {
        state.identity.clone()
    }
}
