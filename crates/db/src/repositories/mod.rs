use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

use valora_core::domain::customer::{Customer, CustomerRef, CustomerType};
use valora_core::domain::project::Project;
use valora_core::domain::quote::Quote;
use valora_core::domain::service::{Service, ServiceId};
use valora_core::domain::user::UserId;
use valora_core::pricing::PricingWeightsRecord;

pub mod customer;
pub mod memory;
pub mod pricing_weights;
pub mod project;
pub mod quote;
pub mod service;

pub use customer::SqlCustomerRepository;
pub use memory::{
    InMemoryCustomerRepository, InMemoryPricingWeightsRepository, InMemoryProjectRepository,
    InMemoryQuoteRepository, InMemoryServiceRepository,
};
pub use pricing_weights::SqlPricingWeightsRepository;
pub use project::SqlProjectRepository;
pub use quote::SqlQuoteRepository;
pub use service::SqlServiceRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Quote reads used by the valuation routes. `agent` restricts results to quotes created by
/// that user; `None` means every quote.
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn list_for_customer(
        &self,
        customer: &CustomerRef,
        agent: Option<&UserId>,
    ) -> Result<Vec<Quote>, RepositoryError>;

    /// Quotes ordered by creation time, optionally restricted to one customer kind.
    async fn list_scoped(
        &self,
        agent: Option<&UserId>,
        customer_type: Option<CustomerType>,
    ) -> Result<Vec<Quote>, RepositoryError>;

    async fn save(&self, quote: Quote) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find(&self, customer: &CustomerRef) -> Result<Option<Customer>, RepositoryError>;
    async fn save(&self, customer: Customer) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Projects of the customer in an active lifecycle state, regardless of who created them.
    async fn count_active(&self, customer: &CustomerRef) -> Result<u64, RepositoryError>;
    async fn save(&self, project: Project) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn find_by_id(&self, id: &ServiceId) -> Result<Option<Service>, RepositoryError>;
    async fn list_active(&self) -> Result<Vec<Service>, RepositoryError>;
    async fn save(&self, service: Service) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PricingWeightsRepository: Send + Sync {
    async fn find_active(&self) -> Result<Option<PricingWeightsRecord>, RepositoryError>;
    /// Stores `record` and makes it the only active configuration.
    async fn activate(&self, record: PricingWeightsRecord) -> Result<(), RepositoryError>;
}

/// Accepts RFC 3339 as written by this crate and the `YYYY-MM-DD HH:MM:SS` form SQLite's
/// `CURRENT_TIMESTAMP` produces.
pub(crate) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}`: {error}")))
}

pub(crate) fn decode_err(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

/// Owner column holding the id for a customer kind.
pub(crate) fn owner_column(customer_type: CustomerType) -> &'static str {
    match customer_type {
        CustomerType::PersonaFisica => "persona_fisica_id",
        CustomerType::PersonaGiuridica => "persona_giuridica_id",
    }
}
