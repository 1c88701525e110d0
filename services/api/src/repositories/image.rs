//! Image repository for database operations

use async_trait::async_trait;
use common::error::DatabaseResult;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::Image;

fn image_from_row(row: &PgRow) -> Result<Image, sqlx::Error> {
    Ok(Image {
        id: row.try_get("id")?,
        property_id: row.try_get("property_id")?,
        image: row.try_get("image")?,
        main: row.try_get("main")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Persistence of property pictures
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Pictures of a property, main image first
    async fn list(&self, property_id: Uuid) -> DatabaseResult<Vec<Image>>;

    /// Store a picture; a new main image demotes the previous one
    async fn add(&self, image: &Image) -> DatabaseResult<Image>;

    async fn delete(&self, property_id: Uuid, image_id: Uuid) -> DatabaseResult<bool>;
}

/// PostgreSQL image repository
#[derive(Clone)]
pub struct PgImageRepository {
    pool: PgPool,
}

impl PgImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageRepository for PgImageRepository {
    async fn list(&self, property_id: Uuid) -> DatabaseResult<Vec<Image>> {
        let rows = sqlx::query(
            r#"
            SELECT id, property_id, image, main, created_at
            FROM images
            WHERE property_id = $1
            ORDER BY main DESC, created_at
            "#,
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(image_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn add(&self, image: &Image) -> DatabaseResult<Image> {
        let mut tx = self.pool.begin().await?;

        if image.main {
            sqlx::query("UPDATE images SET main = FALSE WHERE property_id = $1 AND main")
                .bind(image.property_id)
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query(
            r#"
            INSERT INTO images (id, property_id, image, main)
            VALUES ($1, $2, $3, $4)
            RETURNING id, property_id, image, main, created_at
            "#,
        )
        .bind(image.id)
        .bind(image.property_id)
        .bind(&image.image)
        .bind(image.main)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(image_from_row(&row)?)
    }

    async fn delete(&self, property_id: Uuid, image_id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1 AND property_id = $2")
            .bind(image_id)
            .bind(property_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
