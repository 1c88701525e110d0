//! User repository for database operations

use async_trait::async_trait;
use common::error::DatabaseResult;
use common::user::{USER_COLUMNS, User};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

/// Persistence of user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user
    async fn create(&self, user: &User) -> DatabaseResult<User>;

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;

    /// Whether another account already uses `email`
    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> DatabaseResult<bool>;

    /// Whether another account already uses `username`
    async fn username_taken(&self, username: &str, except: Option<Uuid>) -> DatabaseResult<bool>;

    /// One page of users ordered by username, with the total count
    async fn list(&self, offset: i64, limit: i64) -> DatabaseResult<(Vec<User>, i64)>;

    /// Persist profile fields, role and status flags
    async fn update(&self, user: &User) -> DatabaseResult<User>;

    async fn set_password(&self, id: Uuid, password_hash: &str) -> DatabaseResult<()>;

    /// Whether the user owns at least one property
    async fn owns_property(&self, id: Uuid) -> DatabaseResult<bool>;
}

/// PostgreSQL user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(User::from_row).transpose()?)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &User) -> DatabaseResult<User> {
        info!("Creating new user: {}", user.username);

        let sql = format!(
            r#"
            INSERT INTO users (id, email, username, password_hash, first_name, last_name,
                               phone_number, role, is_active, email_verified, is_superuser,
                               deactivated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone_number)
            .bind(user.role.as_str())
            .bind(user.is_active)
            .bind(user.email_verified)
            .bind(user.is_superuser)
            .bind(user.deactivated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(User::from_row(&row)?)
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(User::from_row).transpose()?)
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        self.fetch_one_by("email", email).await
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> DatabaseResult<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn username_taken(&self, username: &str, except: Option<Uuid>) -> DatabaseResult<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(username)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn list(&self, offset: i64, limit: i64) -> DatabaseResult<(Vec<User>, i64)> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY username LIMIT $1 OFFSET $2",
            USER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let users = rows
            .iter()
            .map(User::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((users, count))
    }

    async fn update(&self, user: &User) -> DatabaseResult<User> {
        let sql = format!(
            r#"
            UPDATE users
            SET email = $2, username = $3, first_name = $4, last_name = $5,
                phone_number = $6, role = $7, is_active = $8, email_verified = $9,
                deactivated_at = $10, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone_number)
            .bind(user.role.as_str())
            .bind(user.is_active)
            .bind(user.email_verified)
            .bind(user.deactivated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(User::from_row(&row)?)
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> DatabaseResult<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn owns_property(&self, id: Uuid) -> DatabaseResult<bool> {
        let owns: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM properties WHERE owner_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        Ok(owns)
    }
}
