//! Favorite repository for database operations

use async_trait::async_trait;
use common::error::DatabaseResult;
use sqlx::PgPool;
use uuid::Uuid;

use super::property::{PROPERTY_COLUMNS, property_from_row};
use crate::models::Property;

/// Favorites of user `$1` that stay visible to them; `$2` is the staff flag
const VISIBLE_FAVORITE: &str = "f.user_id = $1 \
     AND ((p.listed AND p.active) OR p.owner_id = $1 OR p.agent_id = $1 OR $2)";

/// Users' saved properties
#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// Properties saved by the user that the user can still see, most
    /// recently saved first, with the total count
    ///
    /// Staff see every saved property; everyone else only public ones and
    /// those they own or manage.
    async fn list(
        &self,
        user_id: Uuid,
        staff: bool,
        offset: i64,
        limit: i64,
    ) -> DatabaseResult<(Vec<Property>, i64)>;

    /// Save a property; false when it was already saved
    async fn add(&self, user_id: Uuid, property_id: Uuid) -> DatabaseResult<bool>;

    /// Forget a property; false when it was not saved
    async fn remove(&self, user_id: Uuid, property_id: Uuid) -> DatabaseResult<bool>;
}

/// PostgreSQL favorite repository
#[derive(Clone)]
pub struct PgFavoriteRepository {
    pool: PgPool,
}

impl PgFavoriteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FavoriteRepository for PgFavoriteRepository {
    async fn list(
        &self,
        user_id: Uuid,
        staff: bool,
        offset: i64,
        limit: i64,
    ) -> DatabaseResult<(Vec<Property>, i64)> {
        let sql = format!(
            r#"
            SELECT {}
            FROM favorites f
            JOIN properties p ON p.id = f.property_id
            WHERE {}
            ORDER BY f.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            PROPERTY_COLUMNS, VISIBLE_FAVORITE
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(staff)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!(
            "SELECT COUNT(*) FROM favorites f JOIN properties p ON p.id = f.property_id WHERE {}",
            VISIBLE_FAVORITE
        );
        let count: i64 = sqlx::query_scalar(&count_sql)
            .bind(user_id)
            .bind(staff)
            .fetch_one(&self.pool)
            .await?;

        let properties = rows
            .iter()
            .map(property_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((properties, count))
    }

    async fn add(&self, user_id: Uuid, property_id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "INSERT INTO favorites (user_id, property_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(property_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, user_id: Uuid, property_id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND property_id = $2")
            .bind(user_id)
            .bind(property_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
