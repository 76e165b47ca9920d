use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;
use valora_db::DbPool;

/// Tables the valuation and pricing routes read; their absence means migrations never ran.
const REQUIRED_TABLES: [&str; 4] = ["quote", "project", "service", "pricing_weights_config"];

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub schema: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let schema = if database.status == "ready" {
        schema_check(&state.db_pool).await
    } else {
        HealthCheck { status: "unknown", detail: "database unreachable".to_string() }
    };
    let ready = database.status == "ready" && schema.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        database,
        schema,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            warn!(event_name = "system.health.database_failed", error = %error, "health probe failed");
            HealthCheck { status: "degraded", detail: "database query failed".to_string() }
        }
    }
}

async fn schema_check(pool: &DbPool) -> HealthCheck {
    let placeholders = vec!["?"; REQUIRED_TABLES.len()].join(", ");
    let sql = format!(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ({placeholders})"
    );
    let query = REQUIRED_TABLES
        .iter()
        .fold(sqlx::query_scalar::<_, i64>(&sql), |query, table| query.bind(*table));

    match query.fetch_one(pool).await {
        Ok(found) if found == REQUIRED_TABLES.len() as i64 => {
            HealthCheck { status: "ready", detail: "schema migrated".to_string() }
        }
        Ok(found) => HealthCheck {
            status: "degraded",
            detail: format!("{found} of {} required tables present", REQUIRED_TABLES.len()),
        },
        Err(error) => {
            warn!(event_name = "system.health.schema_failed", error = %error, "schema probe failed");
            HealthCheck { status: "degraded", detail: "schema query failed".to_string() }
        }
    }
}
