//! API models for request and response payloads

use common::validation::FieldErrors;
use serde::{Deserialize, Deserializer, Serialize};

use crate::validation::check_min;

pub mod agent;
pub mod filters;
pub mod image;
pub mod location;
pub mod property;
pub mod rent_details;

pub use agent::{AgentConfirmRequest, AgentRequest, TokenQuery};
pub use filters::PropertyFilters;
pub use image::{Image, ImageRequest};
pub use location::{Location, LocationRequest};
pub use property::{
    CreatePropertyRequest, NewProperty, Property, PropertyResponse, PropertyType,
    UpdatePropertyRequest,
};
pub use rent_details::{RentDetails, RentDetailsRequest};

pub const DEFAULT_CURRENCY: &str = "USD";

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// An amount in minor units with its ISO 4217 currency code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Money {
    pub fn new(amount: i64, currency: &str) -> Self {
        Self {
            amount,
            currency: currency.to_string(),
        }
    }

    /// Record problems with this amount under `field`
    pub fn check(&self, errors: &mut FieldErrors, field: &str) {
        check_min(errors, field, self.amount, 0);
        let valid_code =
            self.currency.len() == 3 && self.currency.chars().all(|c| c.is_ascii_uppercase());
        if !valid_code {
            errors.add(field, "Enter a valid currency code.");
        }
    }
}

/// Distinguish an explicit `null` (clear the value) from an absent field
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
