//! Property listings

use chrono::{DateTime, NaiveDate, Utc};
use common::validation::FieldErrors;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::{Image, Location, LocationRequest, Money, RentDetails, RentDetailsRequest, nullable};
use crate::validation::{TEXT_MAX_LENGTH, check_min, nested, required, required_text};

/// Feature tags a listing may carry
pub const FEATURES: &[&str] = &[
    "air_conditioning",
    "balcony",
    "dishwasher",
    "elevator",
    "fireplace",
    "furnished",
    "garage",
    "garden",
    "gym",
    "heating",
    "internet",
    "laundry",
    "parking",
    "pet_friendly",
    "pool",
    "security",
    "storage",
    "terrace",
    "wheelchair_access",
];

/// Kind of property
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    House,
    #[default]
    Apartment,
    Condo,
    Townhouse,
    Land,
    Other,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::House => "house",
            PropertyType::Apartment => "apartment",
            PropertyType::Condo => "condo",
            PropertyType::Townhouse => "townhouse",
            PropertyType::Land => "land",
            PropertyType::Other => "other",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown property type: {0}")]
pub struct UnknownPropertyType(pub String);

impl FromStr for PropertyType {
    type Err = UnknownPropertyType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "house" => Ok(PropertyType::House),
            "apartment" => Ok(PropertyType::Apartment),
            "condo" => Ok(PropertyType::Condo),
            "townhouse" => Ok(PropertyType::Townhouse),
            "land" => Ok(PropertyType::Land),
            "other" => Ok(PropertyType::Other),
            other => Err(UnknownPropertyType(other.to_string())),
        }
    }
}

/// Property entity as stored in the `properties` table
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub agent_id: Option<Uuid>,
    /// Agent asked to manage the property who has not answered yet
    pub pending_agent_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub price: Money,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub property_type: PropertyType,
    pub features: Vec<String>,
    pub total_floors: Option<i32>,
    pub floor_number: Option<i32>,
    pub built: NaiveDate,
    pub listed: bool,
    pub active: bool,
    pub for_sale: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Visible to anyone, signed in or not
    pub fn is_public(&self) -> bool {
        self.listed && self.active
    }

    /// Checks that span several fields or need the full record
    pub fn check(&self, errors: &mut FieldErrors) {
        check_min(errors, "bedrooms", self.bedrooms.into(), 0);
        check_min(errors, "bathrooms", self.bathrooms.into(), 0);

        for feature in &self.features {
            if !FEATURES.contains(&feature.as_str()) {
                errors.add(
                    "features",
                    format!("\"{}\" is not a valid choice.", feature),
                );
            }
        }

        if let Some(total) = self.total_floors {
            check_min(errors, "total_floors", total.into(), 1);
        }
        if let Some(floor) = self.floor_number {
            check_min(errors, "floor_number", floor.into(), 0);
        }
        if let (Some(total), Some(floor)) = (self.total_floors, self.floor_number) {
            if floor > total {
                errors.add(
                    "floor_number",
                    "Floor number cannot be greater than the total number of floors.",
                );
            }
        }
    }
}

/// Listing payload; `location` and `rent_details` may be sent inline
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePropertyRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub bedrooms: Option<i32>,
    #[serde(default)]
    pub bathrooms: Option<i32>,
    #[serde(default, rename = "type")]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default)]
    pub total_floors: Option<i32>,
    #[serde(default)]
    pub floor_number: Option<i32>,
    #[serde(default)]
    pub built: Option<NaiveDate>,
    #[serde(default)]
    pub listed: Option<bool>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub for_sale: Option<bool>,
    #[serde(default)]
    pub location: Option<LocationRequest>,
    #[serde(default)]
    pub rent_details: Option<RentDetailsRequest>,
}

/// A validated new listing with its inline one-to-one records
#[derive(Debug)]
pub struct NewProperty {
    pub property: Property,
    pub location: Option<Location>,
    pub rent_details: Option<RentDetails>,
}

impl CreatePropertyRequest {
    /// Validate the payload into a listing owned by `owner_id`
    ///
    /// Errors of the inline records are reported as `location.<field>` and
    /// `rent_details.<field>`.
    pub fn into_new(self, owner_id: Uuid) -> Result<NewProperty, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = required_text(&mut errors, "title", self.title, TEXT_MAX_LENGTH);
        let description = required_text(&mut errors, "description", self.description, usize::MAX);
        let price = required(&mut errors, "price", self.price);
        let bedrooms = required(&mut errors, "bedrooms", self.bedrooms);
        let bathrooms = required(&mut errors, "bathrooms", self.bathrooms);
        let built = required(&mut errors, "built", self.built);

        if let Some(price) = &price {
            price.check(&mut errors, "price");
        }

        let id = Uuid::new_v4();

        let location = match self.location.map(|l| l.into_location(id)) {
            Some(Err(e)) => {
                errors.merge(nested("location", e));
                None
            }
            Some(Ok(location)) => Some(location),
            None => None,
        };
        let rent_details = match self.rent_details.map(|r| r.into_rent_details(id)) {
            Some(Err(e)) => {
                errors.merge(nested("rent_details", e));
                None
            }
            Some(Ok(rent_details)) => Some(rent_details),
            None => None,
        };

        let (Some(price), Some(bedrooms), Some(bathrooms), Some(built)) =
            (price, bedrooms, bathrooms, built)
        else {
            return Err(errors);
        };

        let now = Utc::now();
        let property = Property {
            id,
            owner_id,
            agent_id: None,
            pending_agent_id: None,
            title,
            description,
            price,
            bedrooms,
            bathrooms,
            property_type: self.property_type.unwrap_or_default(),
            features: self.features.unwrap_or_default(),
            total_floors: self.total_floors,
            floor_number: self.floor_number,
            built,
            listed: self.listed.unwrap_or(false),
            active: self.active.unwrap_or(true),
            for_sale: self.for_sale.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        property.check(&mut errors);
        errors.into_result()?;

        Ok(NewProperty {
            property,
            location,
            rent_details,
        })
    }
}

/// Partial listing update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePropertyRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub bedrooms: Option<i32>,
    #[serde(default)]
    pub bathrooms: Option<i32>,
    #[serde(default, rename = "type")]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub total_floors: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub floor_number: Option<Option<i32>>,
    #[serde(default)]
    pub built: Option<NaiveDate>,
    #[serde(default)]
    pub listed: Option<bool>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub for_sale: Option<bool>,
}

impl UpdatePropertyRequest {
    /// Apply the present fields to `property` and validate the result
    pub fn apply(self, mut property: Property) -> Result<Property, FieldErrors> {
        let mut errors = FieldErrors::new();

        if let Some(title) = self.title {
            property.title = required_text(&mut errors, "title", Some(title), TEXT_MAX_LENGTH);
        }
        if let Some(description) = self.description {
            property.description =
                required_text(&mut errors, "description", Some(description), usize::MAX);
        }
        if let Some(price) = self.price {
            price.check(&mut errors, "price");
            property.price = price;
        }
        if let Some(bedrooms) = self.bedrooms {
            property.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = self.bathrooms {
            property.bathrooms = bathrooms;
        }
        if let Some(property_type) = self.property_type {
            property.property_type = property_type;
        }
        if let Some(features) = self.features {
            property.features = features;
        }
        if let Some(total_floors) = self.total_floors {
            property.total_floors = total_floors;
        }
        if let Some(floor_number) = self.floor_number {
            property.floor_number = floor_number;
        }
        if let Some(built) = self.built {
            property.built = built;
        }
        if let Some(listed) = self.listed {
            property.listed = listed;
        }
        if let Some(active) = self.active {
            property.active = active;
        }
        if let Some(for_sale) = self.for_sale {
            property.for_sale = for_sale;
        }

        property.check(&mut errors);
        errors.into_result()?;
        Ok(property)
    }
}

/// Listing as returned by the API, with its related records
#[derive(Debug, Clone, Serialize)]
pub struct PropertyResponse {
    pub id: Uuid,
    pub owner: Uuid,
    pub agent: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub price: Money,
    pub bedrooms: i32,
    pub bathrooms: i32,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub features: Vec<String>,
    pub total_floors: Option<i32>,
    pub floor_number: Option<i32>,
    pub built: NaiveDate,
    pub listed: bool,
    pub active: bool,
    pub for_sale: bool,
    pub location: Option<Location>,
    pub rent_details: Option<RentDetails>,
    pub images: Vec<Image>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl PropertyResponse {
    pub fn new(
        property: Property,
        location: Option<Location>,
        rent_details: Option<RentDetails>,
        images: Vec<Image>,
    ) -> Self {
        Self {
            id: property.id,
            owner: property.owner_id,
            agent: property.agent_id,
            title: property.title,
            description: property.description,
            price: property.price,
            bedrooms: property.bedrooms,
            bathrooms: property.bathrooms,
            property_type: property.property_type,
            features: property.features,
            total_floors: property.total_floors,
            floor_number: property.floor_number,
            built: property.built,
            listed: property.listed,
            active: property.active,
            for_sale: property.for_sale,
            location,
            rent_details,
            images,
            created: property.created_at,
            updated: property.updated_at,
        }
    }
}
