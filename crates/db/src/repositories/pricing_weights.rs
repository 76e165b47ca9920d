use sqlx::Row;

use valora_core::domain::user::UserId;
use valora_core::pricing::{PricingWeightsPatch, PricingWeightsRecord};

use super::{decode_err, parse_timestamp, PricingWeightsRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPricingWeightsRepository {
    pool: DbPool,
}

impl SqlPricingWeightsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<PricingWeightsRecord, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let weights_json: String = row.try_get("weights_json").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;

    let weights: PricingWeightsPatch = serde_json::from_str(&weights_json)
        .map_err(|error| RepositoryError::Decode(format!("weights of {id}: {error}")))?;

    Ok(PricingWeightsRecord {
        label: row.try_get("label").map_err(decode_err)?,
        weights,
        created_by: UserId(row.try_get("created_by").map_err(decode_err)?),
        created_at: parse_timestamp("created_at", &created_at)?,
        id,
    })
}

#[async_trait::async_trait]
impl PricingWeightsRepository for SqlPricingWeightsRepository {
    async fn find_active(&self) -> Result<Option<PricingWeightsRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, label, weights_json, created_by, created_at
             FROM pricing_weights_config
             WHERE is_active = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn activate(&self, record: PricingWeightsRecord) -> Result<(), RepositoryError> {
        let weights_json = serde_json::to_string(&record.weights).map_err(decode_err)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE pricing_weights_config SET is_active = 0 WHERE is_active = 1")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO pricing_weights_config (id, label, weights_json, is_active, created_by, created_at)
             VALUES (?, ?, ?, 1, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 label = excluded.label,
                 weights_json = excluded.weights_json,
                 is_active = 1",
        )
        .bind(&record.id)
        .bind(&record.label)
        .bind(&weights_json)
        .bind(&record.created_by.0)
        .bind(record.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
