use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{debug, info};
use valora_core::clv::{
    compute_customer_clv, distinct_customers, sort_valuations, ClvScope, ClvSort,
    CustomerClvResult,
};
use valora_core::domain::customer::{CustomerId, CustomerRef, CustomerType};
use valora_core::domain::quote::Quote;
use valora_core::errors::{ApplicationError, DomainError};

use crate::error::{new_correlation_id, ApiError};
use crate::identity::Identity;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ClvListQuery {
    pub customer_type: Option<String>,
    pub sort: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/clv", get(list_customer_clv))
        .route("/api/v1/customers/{customer_type}/{customer_id}/clv", get(customer_clv))
        .with_state(state)
}

/// `all` and an empty value mean no restriction.
fn parse_customer_type_filter(raw: Option<&str>) -> Result<Option<CustomerType>, DomainError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("all") => Ok(None),
        Some(value) => CustomerType::from_str(value).map(Some),
    }
}

async fn list_customer_clv(
    State(state): State<AppState>,
    Identity(user): Identity,
    Query(query): Query<ClvListQuery>,
) -> Result<Json<Vec<CustomerClvResult>>, ApiError> {
    let correlation_id = new_correlation_id();
    let invalid = |error: DomainError| ApiError::new(ApplicationError::from(error), &correlation_id);

    let customer_type = parse_customer_type_filter(query.customer_type.as_deref()).map_err(invalid)?;
    let sort = ClvSort::from_str(query.sort.as_deref().unwrap_or_default()).map_err(invalid)?;
    let scope = ClvScope::for_user(&user);

    let quotes = state
        .quotes
        .list_scoped(scope.agent_id(), customer_type)
        .await
        .map_err(|error| ApiError::persistence(error, &correlation_id))?;

    let mut valuations = Vec::new();
    for customer in distinct_customers(&quotes, customer_type) {
        let customer_quotes: Vec<Quote> =
            quotes.iter().filter(|quote| quote.customer == customer).cloned().collect();

        match valuate(&state, customer, &scope, &customer_quotes, &correlation_id).await? {
            Some(valuation) => valuations.push(valuation),
            None => debug!(
                event_name = "clv.list.customer_skipped",
                correlation_id = %correlation_id,
                customer = %customer,
                "customer name could not be resolved"
            ),
        }
    }
    sort_valuations(&mut valuations, sort);

    info!(
        event_name = "clv.list.completed",
        correlation_id = %correlation_id,
        user_id = %user.id,
        scope = if scope.agent_id().is_some() { "agent" } else { "global" },
        quotes = quotes.len(),
        customers = valuations.len(),
        "customer valuations computed"
    );

    Ok(Json(valuations))
}

async fn customer_clv(
    State(state): State<AppState>,
    Identity(user): Identity,
    Path((customer_type, customer_id)): Path<(String, String)>,
) -> Result<Json<CustomerClvResult>, ApiError> {
    let correlation_id = new_correlation_id();
    let invalid = |error: DomainError| ApiError::new(ApplicationError::from(error), &correlation_id);

    let customer = CustomerRef {
        customer_type: CustomerType::from_str(&customer_type).map_err(invalid)?,
        id: CustomerId::from_str(&customer_id).map_err(invalid)?,
    };
    let scope = ClvScope::for_user(&user);

    let quotes = state
        .quotes
        .list_for_customer(&customer, scope.agent_id())
        .await
        .map_err(|error| ApiError::persistence(error, &correlation_id))?;

    let valuation = valuate(&state, customer, &scope, &quotes, &correlation_id)
        .await?
        .ok_or_else(|| {
            ApiError::new(ApplicationError::NotFound(format!("customer {customer}")), &correlation_id)
        })?;

    info!(
        event_name = "clv.customer.completed",
        correlation_id = %correlation_id,
        user_id = %user.id,
        customer = %customer,
        total_quotes = valuation.total_quotes,
        "customer valuation computed"
    );

    Ok(Json(valuation))
}

/// Loads the collaborators of one valuation and runs the aggregator over `quotes`.
async fn valuate(
    state: &AppState,
    customer: CustomerRef,
    scope: &ClvScope,
    quotes: &[Quote],
    correlation_id: &str,
) -> Result<Option<CustomerClvResult>, ApiError> {
    let persistence = |error| ApiError::persistence(error, correlation_id);

    let display_name = state
        .customers
        .find(&customer)
        .await
        .map_err(persistence)?
        .and_then(|record| record.display_name());
    let active_projects = state.projects.count_active(&customer).await.map_err(persistence)?;

    compute_customer_clv(customer, scope, quotes, active_projects, display_name.as_deref())
        .map_err(|error| ApiError::new(ApplicationError::from(error), correlation_id))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use tower::ServiceExt;
    use uuid::Uuid;
    use valora_core::domain::customer::{Customer, CustomerId, CustomerRef, CustomerType};
    use valora_core::domain::project::{Project, ProjectId, ProjectStatus};
    use valora_core::domain::quote::{Quote, QuoteId, QuoteStatus};
    use valora_core::domain::user::UserId;
    use valora_db::repositories::{
        CustomerRepository, ProjectRepository, QuoteRepository, RepositoryError,
    };

    use super::router;
    use crate::identity::{USER_ID_HEADER, USER_ROLE_HEADER};
    use crate::state::testing::Fixture;
    use crate::state::AppState;

    struct BrokenQuoteRepository;

    #[async_trait::async_trait]
    impl QuoteRepository for BrokenQuoteRepository {
        async fn list_for_customer(
            &self,
            _customer: &CustomerRef,
            _agent: Option<&UserId>,
        ) -> Result<Vec<Quote>, RepositoryError> {
            Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn list_scoped(
            &self,
            _agent: Option<&UserId>,
            _customer_type: Option<CustomerType>,
        ) -> Result<Vec<Quote>, RepositoryError> {
            Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn save(&self, _quote: Quote) -> Result<(), RepositoryError> {
            Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    struct Seeded {
        fixture: Fixture,
        rossi: CustomerRef,
        acme: CustomerRef,
        ghost: CustomerRef,
    }

    fn quote(
        id: &str,
        customer: CustomerRef,
        agent: &str,
        total: i64,
        status: QuoteStatus,
        (month, day): (u32, u32),
    ) -> Quote {
        Quote {
            id: QuoteId(id.to_string()),
            customer,
            total: Some(Decimal::new(total, 0)),
            status,
            created_at: Utc.with_ymd_and_hms(2024, month, day, 9, 0, 0).single().expect("date"),
            created_by: UserId(agent.to_string()),
        }
    }

    async fn seeded() -> Seeded {
        let fixture = Fixture::new();
        let rossi_id = CustomerId(Uuid::new_v4());
        let acme_id = CustomerId(Uuid::new_v4());
        let rossi = CustomerRef::persona_fisica(rossi_id);
        let acme = CustomerRef::persona_giuridica(acme_id);
        let ghost = CustomerRef::persona_fisica(CustomerId(Uuid::new_v4()));

        fixture
            .customers
            .save(Customer::PersonaFisica {
                id: rossi_id,
                nome: "Anna".to_string(),
                cognome: "Rossi".to_string(),
            })
            .await
            .expect("save");
        fixture
            .customers
            .save(Customer::PersonaGiuridica { id: acme_id, ragione_sociale: "Acme Srl".to_string() })
            .await
            .expect("save");

        for quote in [
            quote("Q-1", rossi, "agent-a", 100, QuoteStatus::Accepted, (1, 10)),
            quote("Q-2", rossi, "agent-a", 250, QuoteStatus::Accepted, (3, 5)),
            quote("Q-3", rossi, "agent-b", 400, QuoteStatus::Rejected, (2, 1)),
            quote("Q-4", rossi, "agent-b", 80, QuoteStatus::Sent, (2, 2)),
            quote("Q-5", acme, "agent-b", 1000, QuoteStatus::Accepted, (1, 20)),
            quote("Q-6", ghost, "agent-a", 50, QuoteStatus::Accepted, (1, 21)),
        ] {
            fixture.quotes.save(quote).await.expect("save quote");
        }
        fixture
            .projects
            .save(Project {
                id: ProjectId("P-1".to_string()),
                customer: rossi,
                name: "Ristrutturazione".to_string(),
                status: ProjectStatus::InExecution,
            })
            .await
            .expect("save project");

        Seeded { fixture, rossi, acme, ghost }
    }

    async fn get_json(
        seeded: &Seeded,
        uri: &str,
        identity: Option<(&str, &str)>,
    ) -> (StatusCode, serde_json::Value) {
        get_json_with(seeded.fixture.state(), uri, identity).await
    }

    async fn get_json_with(
        state: AppState,
        uri: &str,
        identity: Option<(&str, &str)>,
    ) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().uri(uri);
        if let Some((user, role)) = identity {
            request = request.header(USER_ID_HEADER, user).header(USER_ROLE_HEADER, role);
        }
        let response = router(state)
            .oneshot(request.body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    #[tokio::test]
    async fn admin_sees_every_customer_sorted_by_value() {
        let seeded = seeded().await;

        let (status, body) = get_json(&seeded, "/api/v1/clv", Some(("admin-1", "admin"))).await;

        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().expect("array");
        assert_eq!(rows.len(), 2, "unresolvable customers are skipped");
        assert_eq!(rows[0]["customer_name"], "Acme Srl");
        assert_eq!(rows[0]["customer_lifetime_value"], "1000");
        assert_eq!(rows[1]["customer_id"], seeded.rossi.id.to_string());
        assert_eq!(rows[1]["total_quotes"], 4);
        assert_eq!(rows[1]["accepted_quotes"], 2);
        assert_eq!(rows[1]["conversion_rate"], 50);
        assert_eq!(rows[1]["customer_lifetime_value"], "350");
        assert_eq!(rows[1]["active_projects"], 1);
        assert!(rows[1]["first_purchase_date"].as_str().expect("date").starts_with("2024-01-10"));
        assert!(rows[1]["last_purchase_date"].as_str().expect("date").starts_with("2024-03-05"));
    }

    #[tokio::test]
    async fn agent_only_sees_own_quotes() {
        let seeded = seeded().await;

        let (status, body) =
            get_json(&seeded, "/api/v1/clv?sort=name", Some(("agent-a", "agent"))).await;

        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().expect("array");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["customer_name"], "Anna Rossi");
        assert_eq!(rows[0]["agent_id"], "agent-a");
        assert_eq!(rows[0]["total_quotes"], 2);
        assert_eq!(rows[0]["conversion_rate"], 100);
    }

    #[tokio::test]
    async fn customer_type_filter_and_invalid_parameters() {
        let seeded = seeded().await;
        let admin = Some(("admin-1", "admin"));

        let (_, giuridiche) =
            get_json(&seeded, "/api/v1/clv?customer_type=persona_giuridica", admin).await;
        assert_eq!(giuridiche.as_array().map(Vec::len), Some(1));
        assert_eq!(giuridiche[0]["customer_type"], "persona_giuridica");

        let (status, _) = get_json(&seeded, "/api/v1/clv?customer_type=alien", admin).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get_json(&seeded, "/api/v1/clv?sort=revenue", admin).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().is_some_and(|detail| detail.contains("revenue")));
    }

    #[tokio::test]
    async fn single_customer_valuation_and_not_found() {
        let seeded = seeded().await;
        let admin = Some(("admin-1", "admin"));

        let uri = format!("/api/v1/customers/persona_giuridica/{}/clv", seeded.acme.id);
        let (status, body) = get_json(&seeded, &uri, admin).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["customer_name"], "Acme Srl");
        assert_eq!(body["conversion_rate"], 100);

        let uri = format!("/api/v1/customers/persona_fisica/{}/clv", seeded.ghost.id);
        let (status, _) = get_json(&seeded, &uri, admin).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) =
            get_json(&seeded, "/api/v1/customers/persona_fisica/not-a-uuid/clv", admin).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_identity_is_rejected() {
        let seeded = seeded().await;

        let (status, body) = get_json(&seeded, "/api/v1/clv", None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["correlation_id"].is_string());
    }

    #[tokio::test]
    async fn quote_lookup_failure_is_internal_without_detail() {
        let seeded = seeded().await;
        let state = AppState { quotes: Arc::new(BrokenQuoteRepository), ..seeded.fixture.state() };
        let admin = Some(("admin-1", "admin"));

        let (status, body) = get_json_with(state.clone(), "/api/v1/clv", admin).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.get("detail").is_none());
        assert!(body["correlation_id"].is_string());

        let uri = format!("/api/v1/customers/persona_giuridica/{}/clv", seeded.acme.id);
        let (status, body) = get_json_with(state, &uri, admin).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.get("detail").is_none());
    }

    #[tokio::test]
    async fn lifetime_value_overflow_is_internal_without_detail() {
        let seeded = seeded().await;
        for id in ["Q-7", "Q-8"] {
            let mut huge = quote(id, seeded.acme, "agent-b", 0, QuoteStatus::Accepted, (4, 1));
            huge.total = Some(Decimal::MAX);
            seeded.fixture.quotes.save(huge).await.expect("save quote");
        }

        let uri = format!("/api/v1/customers/persona_giuridica/{}/clv", seeded.acme.id);
        let (status, body) = get_json(&seeded, &uri, Some(("admin-1", "admin"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.get("detail").is_none());
    }
}
