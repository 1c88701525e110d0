//! Where a property is

use common::validation::FieldErrors;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::{TEXT_MAX_LENGTH, check_range, required_text};

const ZIPCODE_MAX_LENGTH: usize = 20;

/// Address of a property, at most one per property
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    #[serde(skip)]
    pub property_id: Uuid,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Full replacement of a property's location
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationRequest {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zipcode: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl LocationRequest {
    pub fn into_location(self, property_id: Uuid) -> Result<Location, FieldErrors> {
        let mut errors = FieldErrors::new();

        let address = required_text(&mut errors, "address", self.address, TEXT_MAX_LENGTH);
        let city = required_text(&mut errors, "city", self.city, TEXT_MAX_LENGTH);
        let state = required_text(&mut errors, "state", self.state, TEXT_MAX_LENGTH);
        let zipcode = required_text(&mut errors, "zipcode", self.zipcode, ZIPCODE_MAX_LENGTH);
        let country = required_text(&mut errors, "country", self.country, TEXT_MAX_LENGTH);

        if let Some(latitude) = self.latitude {
            check_range(&mut errors, "latitude", latitude, -90.0, 90.0);
        }
        if let Some(longitude) = self.longitude {
            check_range(&mut errors, "longitude", longitude, -180.0, 180.0);
        }
        errors.into_result()?;

        Ok(Location {
            property_id,
            address,
            city,
            state,
            zipcode,
            country,
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_location() {
        let request = LocationRequest {
            address: Some("12 Rue de la Paix".to_string()),
            city: Some("Paris".to_string()),
            state: Some("IDF".to_string()),
            zipcode: Some("75002".to_string()),
            country: Some("France".to_string()),
            latitude: Some(48.8686),
            longitude: Some(2.3314),
        };
        let id = Uuid::new_v4();
        let location = request.into_location(id).unwrap();
        assert_eq!(location.property_id, id);
        assert_eq!(location.city, "Paris");
    }

    #[test]
    fn test_coordinates_out_of_range() {
        let request = LocationRequest {
            address: Some("Nowhere".to_string()),
            city: Some("Nowhere".to_string()),
            state: Some("-".to_string()),
            zipcode: Some("0".to_string()),
            country: Some("-".to_string()),
            latitude: Some(-91.0),
            longitude: Some(181.0),
        };
        let errors = request.into_location(Uuid::new_v4()).unwrap_err();
        assert!(errors.get("latitude").is_some());
        assert!(errors.get("longitude").is_some());
        assert!(errors.get("city").is_none());
    }
}
