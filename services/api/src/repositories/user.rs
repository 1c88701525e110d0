//! Read access to user accounts

use async_trait::async_trait;
use common::error::DatabaseResult;
use common::user::{USER_COLUMNS, User};
use sqlx::PgPool;
use uuid::Uuid;

/// Lookup of the accounts managed by the authentication service
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>>;
}

/// PostgreSQL user lookup
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(User::from_row).transpose()?)
    }
}
