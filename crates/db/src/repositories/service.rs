use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::Row;

use valora_core::domain::service::{Service, ServiceId};
use valora_core::pricing::ServiceParams;

use super::{decode_err, RepositoryError, ServiceRepository};
use crate::DbPool;

const SERVICE_COLUMNS: &str = "id, name, CAST(base_price AS TEXT) AS base_price,
    CAST(urgenza AS TEXT) AS urgenza, CAST(complessita AS TEXT) AS complessita,
    CAST(volume_lavoro AS TEXT) AS volume_lavoro, CAST(importanza AS TEXT) AS importanza,
    is_active";

pub struct SqlServiceRepository {
    pool: DbPool,
}

impl SqlServiceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decimal_column(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<Option<Decimal>, RepositoryError> {
    let raw: Option<String> = row.try_get(column).map_err(decode_err)?;
    raw.map(|value| {
        Decimal::from_str(value.trim())
            .map_err(|error| RepositoryError::Decode(format!("{column} `{value}`: {error}")))
    })
    .transpose()
}

fn row_to_service(row: &sqlx::sqlite::SqliteRow) -> Result<Service, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let base_price = decimal_column(row, "base_price")?
        .ok_or_else(|| RepositoryError::Decode(format!("service {id} has no base price")))?;

    Ok(Service {
        name: row.try_get("name").map_err(decode_err)?,
        base_price,
        params: ServiceParams {
            urgenza: decimal_column(row, "urgenza")?,
            complessita: decimal_column(row, "complessita")?,
            volume_lavoro: decimal_column(row, "volume_lavoro")?,
            importanza: decimal_column(row, "importanza")?,
        },
        active: row.try_get::<i64, _>("is_active").map_err(decode_err)? != 0,
        id: ServiceId(id),
    })
}

#[async_trait::async_trait]
impl ServiceRepository for SqlServiceRepository {
    async fn find_by_id(&self, id: &ServiceId) -> Result<Option<Service>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SERVICE_COLUMNS} FROM service WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_service).transpose()
    }

    async fn list_active(&self) -> Result<Vec<Service>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SERVICE_COLUMNS} FROM service WHERE is_active = 1 ORDER BY name ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_service).collect()
    }

    async fn save(&self, service: Service) -> Result<(), RepositoryError> {
        let text = |value: Option<Decimal>| value.map(|value| value.to_string());

        sqlx::query(
            "INSERT INTO service (id, name, base_price, urgenza, complessita, volume_lavoro,
                                  importanza, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 base_price = excluded.base_price,
                 urgenza = excluded.urgenza,
                 complessita = excluded.complessita,
                 volume_lavoro = excluded.volume_lavoro,
                 importanza = excluded.importanza,
                 is_active = excluded.is_active",
        )
        .bind(&service.id.0)
        .bind(&service.name)
        .bind(service.base_price.to_string())
        .bind(text(service.params.urgenza))
        .bind(text(service.params.complessita))
        .bind(text(service.params.volume_lavoro))
        .bind(text(service.params.importanza))
        .bind(i64::from(service.active))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
