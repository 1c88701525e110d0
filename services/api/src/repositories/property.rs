//! Property repository for database operations
//!
//! Covers the listing itself and its one-to-one location and rent details.

use async_trait::async_trait;
use common::error::DatabaseResult;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::{Location, Money, NewProperty, Property, PropertyFilters, RentDetails};

/// Column list matching [`property_from_row`], qualified by the `p` alias
pub const PROPERTY_COLUMNS: &str = "p.id, p.owner_id, p.agent_id, p.pending_agent_id, p.title, \
     p.description, p.price_amount, p.price_currency, p.bedrooms, p.bathrooms, p.property_type, \
     p.features, p.total_floors, p.floor_number, p.built, p.listed, p.active, p.for_sale, \
     p.created_at, p.updated_at";

/// Map a row selected with [`PROPERTY_COLUMNS`]
pub fn property_from_row(row: &PgRow) -> Result<Property, sqlx::Error> {
    let property_type: String = row.try_get("property_type")?;
    let property_type = property_type
        .parse()
        .map_err(|e: crate::models::property::UnknownPropertyType| {
            sqlx::Error::Decode(Box::new(e))
        })?;
    let currency: String = row.try_get("price_currency")?;

    Ok(Property {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        agent_id: row.try_get("agent_id")?,
        pending_agent_id: row.try_get("pending_agent_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        price: Money::new(row.try_get("price_amount")?, currency.trim()),
        bedrooms: row.try_get("bedrooms")?,
        bathrooms: row.try_get("bathrooms")?,
        property_type,
        features: row.try_get("features")?,
        total_floors: row.try_get("total_floors")?,
        floor_number: row.try_get("floor_number")?,
        built: row.try_get("built")?,
        listed: row.try_get("listed")?,
        active: row.try_get("active")?,
        for_sale: row.try_get("for_sale")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn location_from_row(row: &PgRow) -> Result<Location, sqlx::Error> {
    Ok(Location {
        property_id: row.try_get("property_id")?,
        address: row.try_get("address")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        zipcode: row.try_get("zipcode")?,
        country: row.try_get("country")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
    })
}

fn rent_details_from_row(row: &PgRow) -> Result<RentDetails, sqlx::Error> {
    let rent_currency: String = row.try_get("rent_currency")?;
    let deposit_currency: String = row.try_get("deposit_currency")?;
    let utilities: String = row.try_get("utilities")?;
    let utilities = utilities
        .parse()
        .map_err(|e: crate::models::rent_details::UnknownUtilities| {
            sqlx::Error::Decode(Box::new(e))
        })?;

    Ok(RentDetails {
        property_id: row.try_get("property_id")?,
        rent_price: Money::new(row.try_get("rent_amount")?, rent_currency.trim()),
        deposit: Money::new(row.try_get("deposit_amount")?, deposit_currency.trim()),
        min_rent_time: row.try_get("min_rent_time")?,
        available_from: row.try_get("available_from")?,
        available_to: row.try_get("available_to")?,
        utilities,
    })
}

/// Persistence of listings
#[async_trait]
pub trait PropertyRepository: Send + Sync {
    /// Insert a listing with its inline location and rent details, all or nothing
    async fn create(&self, new: &NewProperty) -> DatabaseResult<NewProperty>;

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Property>>;

    /// Listed and active properties matching `filters`, newest first, with the total count
    async fn list_public(
        &self,
        filters: &PropertyFilters,
        offset: i64,
        limit: i64,
    ) -> DatabaseResult<(Vec<Property>, i64)>;

    /// Every property of `owner_id`, newest first, with the total count
    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> DatabaseResult<(Vec<Property>, i64)>;

    /// Persist every mutable column, including the agent fields
    async fn update(&self, property: &Property) -> DatabaseResult<Property>;

    /// Remove a property and everything attached to it
    async fn delete(&self, id: Uuid) -> DatabaseResult<bool>;

    /// Whether the user owns at least one property
    async fn owns_any(&self, user_id: Uuid) -> DatabaseResult<bool>;

    async fn find_location(&self, property_id: Uuid) -> DatabaseResult<Option<Location>>;

    /// Insert or replace the property's single location
    async fn upsert_location(&self, location: &Location) -> DatabaseResult<Location>;

    async fn delete_location(&self, property_id: Uuid) -> DatabaseResult<bool>;

    async fn find_rent_details(&self, property_id: Uuid) -> DatabaseResult<Option<RentDetails>>;

    /// Insert or replace the property's single set of rent details
    async fn upsert_rent_details(&self, details: &RentDetails) -> DatabaseResult<RentDetails>;

    async fn delete_rent_details(&self, property_id: Uuid) -> DatabaseResult<bool>;
}

/// PostgreSQL property repository
#[derive(Clone)]
pub struct PgPropertyRepository {
    pool: PgPool,
}

impl PgPropertyRepository {
    /// Create a new property repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append the public-listing conditions for `filters`
fn push_public_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &PropertyFilters) {
    builder.push(" WHERE p.listed AND p.active");

    if let Some(property_type) = filters.property_type {
        builder
            .push(" AND p.property_type = ")
            .push_bind(property_type.as_str());
    }
    if let Some(for_sale) = filters.for_sale {
        builder.push(" AND p.for_sale = ").push_bind(for_sale);
    }
    if let Some(min_price) = filters.min_price {
        builder.push(" AND p.price_amount >= ").push_bind(min_price);
    }
    if let Some(max_price) = filters.max_price {
        builder.push(" AND p.price_amount <= ").push_bind(max_price);
    }
    if let Some(bedrooms) = filters.bedrooms {
        builder.push(" AND p.bedrooms >= ").push_bind(bedrooms);
    }
    if let Some(owner) = filters.owner {
        builder.push(" AND p.owner_id = ").push_bind(owner);
    }
    if let Some(city) = &filters.city {
        builder
            .push(" AND EXISTS (SELECT 1 FROM locations l WHERE l.property_id = p.id AND lower(l.city) = lower(")
            .push_bind(city.clone())
            .push("))");
    }
}

async fn insert_property<'e, E: PgExecutor<'e>>(
    executor: E,
    property: &Property,
) -> Result<Property, sqlx::Error> {
    info!("Creating property {} for owner {}", property.id, property.owner_id);

    let sql = format!(
        r#"
        INSERT INTO properties AS p (id, owner_id, agent_id, pending_agent_id, title, description,
                                     price_amount, price_currency, bedrooms, bathrooms,
                                     property_type, features, total_floors, floor_number,
                                     built, listed, active, for_sale)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        RETURNING {}
        "#,
        PROPERTY_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(property.id)
        .bind(property.owner_id)
        .bind(property.agent_id)
        .bind(property.pending_agent_id)
        .bind(&property.title)
        .bind(&property.description)
        .bind(property.price.amount)
        .bind(&property.price.currency)
        .bind(property.bedrooms)
        .bind(property.bathrooms)
        .bind(property.property_type.as_str())
        .bind(&property.features)
        .bind(property.total_floors)
        .bind(property.floor_number)
        .bind(property.built)
        .bind(property.listed)
        .bind(property.active)
        .bind(property.for_sale)
        .fetch_one(executor)
        .await?;

    property_from_row(&row)
}

async fn write_location<'e, E: PgExecutor<'e>>(
    executor: E,
    location: &Location,
) -> Result<Location, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO locations (property_id, address, city, state, zipcode, country,
                               latitude, longitude)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (property_id) DO UPDATE
        SET address = EXCLUDED.address, city = EXCLUDED.city, state = EXCLUDED.state,
            zipcode = EXCLUDED.zipcode, country = EXCLUDED.country,
            latitude = EXCLUDED.latitude, longitude = EXCLUDED.longitude
        RETURNING property_id, address, city, state, zipcode, country, latitude, longitude
        "#,
    )
    .bind(location.property_id)
    .bind(&location.address)
    .bind(&location.city)
    .bind(&location.state)
    .bind(&location.zipcode)
    .bind(&location.country)
    .bind(location.latitude)
    .bind(location.longitude)
    .fetch_one(executor)
    .await?;

    location_from_row(&row)
}

async fn write_rent_details<'e, E: PgExecutor<'e>>(
    executor: E,
    details: &RentDetails,
) -> Result<RentDetails, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO rent_details (property_id, rent_amount, rent_currency, deposit_amount,
                                  deposit_currency, min_rent_time, available_from,
                                  available_to, utilities)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (property_id) DO UPDATE
        SET rent_amount = EXCLUDED.rent_amount, rent_currency = EXCLUDED.rent_currency,
            deposit_amount = EXCLUDED.deposit_amount,
            deposit_currency = EXCLUDED.deposit_currency,
            min_rent_time = EXCLUDED.min_rent_time,
            available_from = EXCLUDED.available_from,
            available_to = EXCLUDED.available_to, utilities = EXCLUDED.utilities
        RETURNING property_id, rent_amount, rent_currency, deposit_amount, deposit_currency,
                  min_rent_time, available_from, available_to, utilities
        "#,
    )
    .bind(details.property_id)
    .bind(details.rent_price.amount)
    .bind(&details.rent_price.currency)
    .bind(details.deposit.amount)
    .bind(&details.deposit.currency)
    .bind(details.min_rent_time)
    .bind(details.available_from)
    .bind(details.available_to)
    .bind(details.utilities.as_str())
    .fetch_one(executor)
    .await?;

    rent_details_from_row(&row)
}

#[async_trait]
impl PropertyRepository for PgPropertyRepository {
    async fn create(&self, new: &NewProperty) -> DatabaseResult<NewProperty> {
        let mut tx = self.pool.begin().await?;

        let property = insert_property(&mut *tx, &new.property).await?;
        let location = match &new.location {
            Some(location) => Some(write_location(&mut *tx, location).await?),
            None => None,
        };
        let rent_details = match &new.rent_details {
            Some(details) => Some(write_rent_details(&mut *tx, details).await?),
            None => None,
        };

        tx.commit().await?;
        Ok(NewProperty {
            property,
            location,
            rent_details,
        })
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Property>> {
        let sql = format!("SELECT {} FROM properties p WHERE p.id = $1", PROPERTY_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(property_from_row).transpose()?)
    }

    async fn list_public(
        &self,
        filters: &PropertyFilters,
        offset: i64,
        limit: i64,
    ) -> DatabaseResult<(Vec<Property>, i64)> {
        let mut query = QueryBuilder::new(format!("SELECT {} FROM properties p", PROPERTY_COLUMNS));
        push_public_filters(&mut query, filters);
        query
            .push(" ORDER BY p.created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = query.build().fetch_all(&self.pool).await?;

        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM properties p");
        push_public_filters(&mut count_query, filters);
        let count: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let properties = rows
            .iter()
            .map(property_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((properties, count))
    }

    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> DatabaseResult<(Vec<Property>, i64)> {
        let sql = format!(
            r#"
            SELECT {}
            FROM properties p
            WHERE p.owner_id = $1
            ORDER BY p.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            PROPERTY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(owner_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM properties WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;

        let properties = rows
            .iter()
            .map(property_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((properties, count))
    }

    async fn update(&self, property: &Property) -> DatabaseResult<Property> {
        let sql = format!(
            r#"
            UPDATE properties AS p
            SET agent_id = $2, pending_agent_id = $3, title = $4, description = $5,
                price_amount = $6, price_currency = $7, bedrooms = $8, bathrooms = $9,
                property_type = $10, features = $11, total_floors = $12, floor_number = $13,
                built = $14, listed = $15, active = $16, for_sale = $17, updated_at = NOW()
            WHERE p.id = $1
            RETURNING {}
            "#,
            PROPERTY_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(property.id)
            .bind(property.agent_id)
            .bind(property.pending_agent_id)
            .bind(&property.title)
            .bind(&property.description)
            .bind(property.price.amount)
            .bind(&property.price.currency)
            .bind(property.bedrooms)
            .bind(property.bathrooms)
            .bind(property.property_type.as_str())
            .bind(&property.features)
            .bind(property.total_floors)
            .bind(property.floor_number)
            .bind(property.built)
            .bind(property.listed)
            .bind(property.active)
            .bind(property.for_sale)
            .fetch_one(&self.pool)
            .await?;

        Ok(property_from_row(&row)?)
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn owns_any(&self, user_id: Uuid) -> DatabaseResult<bool> {
        let owns: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM properties WHERE owner_id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(owns)
    }

    async fn find_location(&self, property_id: Uuid) -> DatabaseResult<Option<Location>> {
        let row = sqlx::query(
            r#"
            SELECT property_id, address, city, state, zipcode, country, latitude, longitude
            FROM locations
            WHERE property_id = $1
            "#,
        )
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(location_from_row).transpose()?)
    }

    async fn upsert_location(&self, location: &Location) -> DatabaseResult<Location> {
        Ok(write_location(&self.pool, location).await?)
    }

    async fn delete_location(&self, property_id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM locations WHERE property_id = $1")
            .bind(property_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_rent_details(&self, property_id: Uuid) -> DatabaseResult<Option<RentDetails>> {
        let row = sqlx::query(
            r#"
            SELECT property_id, rent_amount, rent_currency, deposit_amount, deposit_currency,
                   min_rent_time, available_from, available_to, utilities
            FROM rent_details
            WHERE property_id = $1
            "#,
        )
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(rent_details_from_row).transpose()?)
    }

    async fn upsert_rent_details(&self, details: &RentDetails) -> DatabaseResult<RentDetails> {
        Ok(write_rent_details(&self.pool, details).await?)
    }

    async fn delete_rent_details(&self, property_id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM rent_details WHERE property_id = $1")
            .bind(property_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
