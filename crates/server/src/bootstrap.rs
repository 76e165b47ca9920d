use axum::Router;
use thiserror::Error;
use tracing::info;
use valora_core::config::{AppConfig, ConfigError};
use valora_db::{connect_from_config, migrations, DbPool};

use crate::identity::IdentityGate;
use crate::state::AppState;
use crate::{clv, health, pricing};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_from_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        max_connections = config.database.max_connections,
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    Ok(Application { config, db_pool })
}

impl Application {
    /// Every HTTP route the service exposes.
    pub fn router(&self) -> Router {
        let state = AppState::from_pool(
            self.db_pool.clone(),
            IdentityGate::from_config(&self.config.identity),
        );

        health::router(self.db_pool.clone())
            .merge(clv::router(state.clone()))
            .merge(pricing::router(state))
    }
}
