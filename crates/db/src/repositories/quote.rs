use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::Row;

use valora_core::domain::customer::{CustomerId, CustomerRef, CustomerType};
use valora_core::domain::quote::{Quote, QuoteId, QuoteStatus};
use valora_core::domain::user::UserId;

use super::{decode_err, owner_column, parse_timestamp, QuoteRepository, RepositoryError};
use crate::DbPool;

// grand_total is cast so REAL values written by other tools decode the same way as TEXT.
const QUOTE_COLUMNS: &str = "id, persona_fisica_id, persona_giuridica_id,
    CAST(grand_total AS TEXT) AS grand_total, status, created_by, created_at";

pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_owner(raw: Option<String>) -> Result<Option<CustomerId>, RepositoryError> {
    raw.map(|value| CustomerId::from_str(&value).map_err(decode_err)).transpose()
}

/// Missing or non-numeric totals decode as `None`.
fn parse_total(raw: Option<String>) -> Option<Decimal> {
    raw.and_then(|value| Decimal::from_str(value.trim()).ok())
}

fn row_to_quote(row: &sqlx::sqlite::SqliteRow) -> Result<Quote, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let persona_fisica_id: Option<String> = row.try_get("persona_fisica_id").map_err(decode_err)?;
    let persona_giuridica_id: Option<String> =
        row.try_get("persona_giuridica_id").map_err(decode_err)?;
    let grand_total: Option<String> = row.try_get("grand_total").map_err(decode_err)?;
    let status: String = row.try_get("status").map_err(decode_err)?;
    let created_by: String = row.try_get("created_by").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;

    let customer = CustomerRef::from_owner_columns(
        parse_owner(persona_fisica_id)?,
        parse_owner(persona_giuridica_id)?,
    )
    .map_err(|error| RepositoryError::Decode(format!("quote {id}: {error}")))?;

    Ok(Quote {
        customer,
        total: parse_total(grand_total),
        status: QuoteStatus::from_str(&status).unwrap_or(QuoteStatus::Draft),
        created_at: parse_timestamp("created_at", &created_at)?,
        created_by: UserId(created_by),
        id: QuoteId(id),
    })
}

#[async_trait::async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn list_for_customer(
        &self,
        customer: &CustomerRef,
        agent: Option<&UserId>,
    ) -> Result<Vec<Quote>, RepositoryError> {
        let agent = agent.map(|agent| agent.0.as_str());
        let sql = format!(
            "SELECT {QUOTE_COLUMNS} FROM quote
             WHERE {} = ? AND (? IS NULL OR created_by = ?)
             ORDER BY created_at ASC, id ASC",
            owner_column(customer.customer_type)
        );

        let rows = sqlx::query(&sql)
            .bind(customer.id.to_string())
            .bind(agent)
            .bind(agent)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_quote).collect()
    }

    async fn list_scoped(
        &self,
        agent: Option<&UserId>,
        customer_type: Option<CustomerType>,
    ) -> Result<Vec<Quote>, RepositoryError> {
        let agent = agent.map(|agent| agent.0.as_str());
        let type_filter = customer_type
            .map(|customer_type| format!(" AND {} IS NOT NULL", owner_column(customer_type)))
            .unwrap_or_default();
        let sql = format!(
            "SELECT {QUOTE_COLUMNS} FROM quote
             WHERE (? IS NULL OR created_by = ?){type_filter}
             ORDER BY created_at ASC, id ASC"
        );

        let rows = sqlx::query(&sql).bind(agent).bind(agent).fetch_all(&self.pool).await?;

        rows.iter().map(row_to_quote).collect()
    }

    async fn save(&self, quote: Quote) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO quote (id, persona_fisica_id, persona_giuridica_id, grand_total,
                                status, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 grand_total = excluded.grand_total,
                 status = excluded.status",
        )
        .bind(&quote.id.0)
        .bind(quote.customer.persona_fisica_id().map(|id| id.to_string()))
        .bind(quote.customer.persona_giuridica_id().map(|id| id.to_string()))
        .bind(quote.total.map(|total| total.to_string()))
        .bind(quote.status.as_str())
        .bind(&quote.created_by.0)
        .bind(quote.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
