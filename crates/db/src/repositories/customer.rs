use chrono::Utc;
use sqlx::Row;

use valora_core::domain::customer::{Customer, CustomerRef, CustomerType};

use super::{decode_err, CustomerRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn find(&self, customer: &CustomerRef) -> Result<Option<Customer>, RepositoryError> {
        let id = customer.id.to_string();

        match customer.customer_type {
            CustomerType::PersonaFisica => {
                let row = sqlx::query("SELECT nome, cognome FROM persona_fisica WHERE id = ?")
                    .bind(&id)
                    .fetch_optional(&self.pool)
                    .await?;

                row.map(|row| {
                    Ok(Customer::PersonaFisica {
                        id: customer.id,
                        nome: row.try_get("nome").map_err(decode_err)?,
                        cognome: row.try_get("cognome").map_err(decode_err)?,
                    })
                })
                .transpose()
            }
            CustomerType::PersonaGiuridica => {
                let row = sqlx::query("SELECT ragione_sociale FROM persona_giuridica WHERE id = ?")
                    .bind(&id)
                    .fetch_optional(&self.pool)
                    .await?;

                row.map(|row| {
                    Ok(Customer::PersonaGiuridica {
                        id: customer.id,
                        ragione_sociale: row.try_get("ragione_sociale").map_err(decode_err)?,
                    })
                })
                .transpose()
            }
        }
    }

    async fn save(&self, customer: Customer) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();

        match customer {
            Customer::PersonaFisica { id, nome, cognome } => {
                sqlx::query(
                    "INSERT INTO persona_fisica (id, nome, cognome, created_at)
                     VALUES (?, ?, ?, ?)
                     ON CONFLICT(id) DO UPDATE SET
                         nome = excluded.nome,
                         cognome = excluded.cognome",
                )
                .bind(id.to_string())
                .bind(&nome)
                .bind(&cognome)
                .bind(&now)
                .execute(&self.pool)
                .await?;
            }
            Customer::PersonaGiuridica { id, ragione_sociale } => {
                sqlx::query(
                    "INSERT INTO persona_giuridica (id, ragione_sociale, created_at)
                     VALUES (?, ?, ?)
                     ON CONFLICT(id) DO UPDATE SET
                         ragione_sociale = excluded.ragione_sociale",
                )
                .bind(id.to_string())
                .bind(&ragione_sociale)
                .bind(&now)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }
}
