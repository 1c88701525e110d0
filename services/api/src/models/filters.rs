//! Query parameters for the public listing

use common::pagination::PageParams;
use serde::Deserialize;
use uuid::Uuid;

use super::PropertyType;

/// Filters accepted by `GET /properties/`
///
/// Page parameters are read here as well; query strings cannot be split
/// across flattened structs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyFilters {
    #[serde(default, rename = "type")]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub for_sale: Option<bool>,
    /// Inclusive lower bound on the price amount
    #[serde(default)]
    pub min_price: Option<i64>,
    /// Inclusive upper bound on the price amount
    #[serde(default)]
    pub max_price: Option<i64>,
    /// Minimum number of bedrooms
    #[serde(default)]
    pub bedrooms: Option<i32>,
    /// City of the location, case-insensitive
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub owner: Option<Uuid>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl PropertyFilters {
    pub fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}
