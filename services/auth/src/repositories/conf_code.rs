//! Confirmation code repository

use async_trait::async_trait;
use common::error::DatabaseResult;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::ConfCode;

/// Persistence of confirmation codes
#[async_trait]
pub trait ConfCodeRepository: Send + Sync {
    async fn create(&self, user_id: Uuid, code: &str) -> DatabaseResult<ConfCode>;

    /// The user's code equal to `code`, compared case-sensitively
    async fn find(&self, user_id: Uuid, code: &str) -> DatabaseResult<Option<ConfCode>>;

    /// Remove every code of the user, returning how many were removed
    async fn delete_for_user(&self, user_id: Uuid) -> DatabaseResult<u64>;
}

/// PostgreSQL confirmation code repository
#[derive(Clone)]
pub struct PgConfCodeRepository {
    pool: PgPool,
}

impl PgConfCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConfCodeRepository for PgConfCodeRepository {
    async fn create(&self, user_id: Uuid, code: &str) -> DatabaseResult<ConfCode> {
        let row = sqlx::query(
            r#"
            INSERT INTO conf_codes (id, user_id, code)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, code, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(code)
        .fetch_one(&self.pool)
        .await?;

        Ok(ConfCode {
            id: row.get("id"),
            user_id: row.get("user_id"),
            code: row.get("code"),
            created_at: row.get("created_at"),
        })
    }

    async fn find(&self, user_id: Uuid, code: &str) -> DatabaseResult<Option<ConfCode>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, code, created_at
            FROM conf_codes
            WHERE user_id = $1 AND code = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| ConfCode {
            id: row.get("id"),
            user_id: row.get("user_id"),
            code: row.get("code"),
            created_at: row.get("created_at"),
        }))
    }

    async fn delete_for_user(&self, user_id: Uuid) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM conf_codes WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
