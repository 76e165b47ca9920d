use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use valora_core::domain::service::{Service, ServiceId};
use valora_core::errors::{ApplicationError, DomainError};
use valora_core::pricing::{
    PricingEngine, PricingParams, PricingWeights, PricingWeightsPatch, PricingWeightsRecord,
    QuoteParams, ServiceParams, WeightedPricingEngine,
};

use crate::error::{new_correlation_id, ApiError};
use crate::identity::{AdminIdentity, Identity};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/pricing/weights", get(get_weights).put(put_weights))
        .route("/api/v1/pricing/calculate", post(calculate))
        .route("/api/v1/services", get(list_services))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct UpdateWeightsRequest {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub weights: PricingWeightsPatch,
}

#[derive(Debug, Serialize)]
pub struct WeightsResponse {
    pub weights: PricingWeights,
    /// Id of the stored configuration in effect, absent when running on defaults.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CalculateRequest {
    pub service_id: Option<String>,
    pub base_price: Option<Decimal>,
    pub service_params: ServiceParams,
    pub quote_params: QuoteParams,
}

/// Active weights merged with defaults. A failed lookup falls back to the defaults so pricing
/// keeps working while the configuration store is unavailable.
async fn effective_weights(
    state: &AppState,
    correlation_id: &str,
) -> (PricingWeights, Option<String>) {
    match state.weights.find_active().await {
        Ok(Some(record)) => (PricingWeights::resolve(Some(&record.weights)), Some(record.id)),
        Ok(None) => (PricingWeights::default(), None),
        Err(error) => {
            warn!(
                event_name = "pricing.weights.lookup_failed",
                correlation_id = %correlation_id,
                error = %error,
                "active pricing weights unavailable, using defaults"
            );
            (PricingWeights::default(), None)
        }
    }
}

async fn get_weights(
    State(state): State<AppState>,
    Identity(_user): Identity,
) -> Json<WeightsResponse> {
    let correlation_id = new_correlation_id();
    let (weights, config_id) = effective_weights(&state, &correlation_id).await;
    Json(WeightsResponse { weights, config_id })
}

async fn put_weights(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Json(request): Json<UpdateWeightsRequest>,
) -> Result<Json<WeightsResponse>, ApiError> {
    let correlation_id = new_correlation_id();
    let record = PricingWeightsRecord {
        id: format!("PW-{}", Uuid::new_v4().simple()),
        label: request
            .label
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| "custom".to_string()),
        weights: request.weights,
        created_by: admin.id.clone(),
        created_at: Utc::now(),
    };
    let weights = PricingWeights::resolve(Some(&record.weights));
    let config_id = record.id.clone();

    state
        .weights
        .activate(record)
        .await
        .map_err(|error| ApiError::persistence(error, &correlation_id))?;

    info!(
        event_name = "pricing.weights.activated",
        correlation_id = %correlation_id,
        config_id = %config_id,
        user_id = %admin.id,
        "pricing weights configuration activated"
    );

    Ok(Json(WeightsResponse { weights, config_id: Some(config_id) }))
}

async fn list_services(
    State(state): State<AppState>,
    Identity(_user): Identity,
) -> Result<Json<Vec<Service>>, ApiError> {
    let correlation_id = new_correlation_id();
    let services = state
        .services
        .list_active()
        .await
        .map_err(|error| ApiError::persistence(error, &correlation_id))?;
    Ok(Json(services))
}

/// Fields set in the request win over the catalog entry's.
fn overlay(request: &ServiceParams, catalog: &ServiceParams) -> ServiceParams {
    ServiceParams {
        urgenza: request.urgenza.or(catalog.urgenza),
        complessita: request.complessita.or(catalog.complessita),
        volume_lavoro: request.volume_lavoro.or(catalog.volume_lavoro),
        importanza: request.importanza.or(catalog.importanza),
    }
}

async fn calculate(
    State(state): State<AppState>,
    Identity(user): Identity,
    Json(request): Json<CalculateRequest>,
) -> Result<Json<PricingParams>, ApiError> {
    let correlation_id = new_correlation_id();

    let (base_price, service_params) = match request.service_id.as_deref() {
        Some(service_id) => {
            let service = state
                .services
                .find_by_id(&ServiceId(service_id.to_string()))
                .await
                .map_err(|error| ApiError::persistence(error, &correlation_id))?
                .ok_or_else(|| {
                    ApiError::new(
                        ApplicationError::NotFound(format!("service {service_id}")),
                        &correlation_id,
                    )
                })?;
            (
                request.base_price.unwrap_or(service.base_price),
                overlay(&request.service_params, &service.params),
            )
        }
        None => {
            let base_price = request.base_price.ok_or_else(|| {
                ApiError::bad_request("either service_id or base_price is required", &correlation_id)
            })?;
            (base_price, request.service_params.clone())
        }
    };

    let (weights, config_id) = effective_weights(&state, &correlation_id).await;
    let pricing = WeightedPricingEngine::new(weights)
        .price(base_price, &service_params, &request.quote_params)
        .map_err(|error| {
            ApiError::new(ApplicationError::from(DomainError::from(error)), &correlation_id)
        })?;

    info!(
        event_name = "pricing.calculate.completed",
        correlation_id = %correlation_id,
        user_id = %user.id,
        service_id = request.service_id.as_deref().unwrap_or("none"),
        weights_config = config_id.as_deref().unwrap_or("defaults"),
        budget_interno = %pricing.budget_interno,
        budget_effettivo = %pricing.budget_effettivo,
        "pricing calculated"
    );

    Ok(Json(pricing))
}
