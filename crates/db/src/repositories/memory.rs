use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;

use valora_core::domain::customer::{Customer, CustomerRef, CustomerType};
use valora_core::domain::project::Project;
use valora_core::domain::quote::Quote;
use valora_core::domain::service::{Service, ServiceId};
use valora_core::domain::user::UserId;
use valora_core::pricing::PricingWeightsRecord;

use super::{
    CustomerRepository, PricingWeightsRepository, ProjectRepository, QuoteRepository,
    RepositoryError, ServiceRepository,
};

#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: RwLock<HashMap<String, Quote>>,
}

impl InMemoryQuoteRepository {
    async fn filtered(&self, keep: impl Fn(&Quote) -> bool) -> Vec<Quote> {
        let quotes = self.quotes.read().await;
        let mut matching: Vec<Quote> = quotes.values().filter(|quote| keep(quote)).cloned().collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.0.cmp(&b.id.0)));
        matching
    }
}

fn created_by(quote: &Quote, agent: Option<&UserId>) -> bool {
    agent.map_or(true, |agent| &quote.created_by == agent)
}

#[async_trait::async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn list_for_customer(
        &self,
        customer: &CustomerRef,
        agent: Option<&UserId>,
    ) -> Result<Vec<Quote>, RepositoryError> {
        Ok(self.filtered(|quote| &quote.customer == customer && created_by(quote, agent)).await)
    }

    async fn list_scoped(
        &self,
        agent: Option<&UserId>,
        customer_type: Option<CustomerType>,
    ) -> Result<Vec<Quote>, RepositoryError> {
        Ok(self
            .filtered(|quote| {
                created_by(quote, agent)
                    && customer_type.map_or(true, |kind| quote.customer.customer_type == kind)
            })
            .await)
    }

    async fn save(&self, quote: Quote) -> Result<(), RepositoryError> {
        let mut quotes = self.quotes.write().await;
        quotes.insert(quote.id.0.clone(), quote);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<CustomerRef, Customer>>,
}

#[async_trait::async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find(&self, customer: &CustomerRef) -> Result<Option<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        Ok(customers.get(customer).cloned())
    }

    async fn save(&self, customer: Customer) -> Result<(), RepositoryError> {
        let mut customers = self.customers.write().await;
        customers.insert(customer.customer_ref(), customer);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProjectRepository {
    projects: RwLock<HashMap<String, Project>>,
}

#[async_trait::async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn count_active(&self, customer: &CustomerRef) -> Result<u64, RepositoryError> {
        let projects = self.projects.read().await;
        let count = projects
            .values()
            .filter(|project| &project.customer == customer && project.status.is_active())
            .count();
        Ok(count as u64)
    }

    async fn save(&self, project: Project) -> Result<(), RepositoryError> {
        let mut projects = self.projects.write().await;
        projects.insert(project.id.0.clone(), project);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryServiceRepository {
    services: RwLock<BTreeMap<String, Service>>,
}

#[async_trait::async_trait]
impl ServiceRepository for InMemoryServiceRepository {
    async fn find_by_id(&self, id: &ServiceId) -> Result<Option<Service>, RepositoryError> {
        let services = self.services.read().await;
        Ok(services.get(&id.0).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Service>, RepositoryError> {
        let services = self.services.read().await;
        let mut active: Vec<Service> =
            services.values().filter(|service| service.active).cloned().collect();
        active.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(active)
    }

    async fn save(&self, service: Service) -> Result<(), RepositoryError> {
        let mut services = self.services.write().await;
        services.insert(service.id.0.clone(), service);
        Ok(())
    }
}

/// Keeps only the active record; replaced configurations are not retained.
#[derive(Default)]
pub struct InMemoryPricingWeightsRepository {
    active: RwLock<Option<PricingWeightsRecord>>,
}

#[async_trait::async_trait]
impl PricingWeightsRepository for InMemoryPricingWeightsRepository {
    async fn find_active(&self) -> Result<Option<PricingWeightsRecord>, RepositoryError> {
        Ok(self.active.read().await.clone())
    }

    async fn activate(&self, record: PricingWeightsRecord) -> Result<(), RepositoryError> {
        *self.active.write().await = Some(record);
        Ok(())
    }
}
