use chrono::Utc;
use sqlx::Row;

use valora_core::domain::customer::CustomerRef;
use valora_core::domain::project::{Project, ProjectStatus};

use super::{decode_err, owner_column, ProjectRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProjectRepository {
    pool: DbPool,
}

impl SqlProjectRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProjectRepository for SqlProjectRepository {
    async fn count_active(&self, customer: &CustomerRef) -> Result<u64, RepositoryError> {
        let [first, second, third] = ProjectStatus::ACTIVE;
        let sql = format!(
            "SELECT COUNT(*) AS count FROM project WHERE {} = ? AND status IN (?, ?, ?)",
            owner_column(customer.customer_type)
        );

        let count: i64 = sqlx::query(&sql)
            .bind(customer.id.to_string())
            .bind(first.as_str())
            .bind(second.as_str())
            .bind(third.as_str())
            .fetch_one(&self.pool)
            .await?
            .try_get("count")
            .map_err(decode_err)?;

        u64::try_from(count).map_err(decode_err)
    }

    async fn save(&self, project: Project) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO project (id, persona_fisica_id, persona_giuridica_id, name, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 status = excluded.status",
        )
        .bind(&project.id.0)
        .bind(project.customer.persona_fisica_id().map(|id| id.to_string()))
        .bind(project.customer.persona_giuridica_id().map(|id| id.to_string()))
        .bind(&project.name)
        .bind(project.status.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
