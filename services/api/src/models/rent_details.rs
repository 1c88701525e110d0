//! Rental terms of a property

use chrono::NaiveDate;
use common::validation::FieldErrors;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::Money;
use crate::validation::{check_min, required};

/// Who pays for utilities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Utilities {
    #[serde(rename = "included")]
    Included,
    #[default]
    #[serde(rename = "paid by tenant")]
    PaidByTenant,
}

impl Utilities {
    pub fn as_str(&self) -> &'static str {
        match self {
            Utilities::Included => "included",
            Utilities::PaidByTenant => "paid by tenant",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown utilities option: {0}")]
pub struct UnknownUtilities(pub String);

impl FromStr for Utilities {
    type Err = UnknownUtilities;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "included" => Ok(Utilities::Included),
            "paid by tenant" => Ok(Utilities::PaidByTenant),
            other => Err(UnknownUtilities(other.to_string())),
        }
    }
}

/// Rental terms, at most one set per property
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RentDetails {
    #[serde(skip)]
    pub property_id: Uuid,
    pub rent_price: Money,
    pub deposit: Money,
    /// Minimum rental period in months
    pub min_rent_time: Option<i32>,
    pub available_from: Option<NaiveDate>,
    pub available_to: Option<NaiveDate>,
    pub utilities: Utilities,
}

/// Full replacement of a property's rental terms
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RentDetailsRequest {
    #[serde(default)]
    pub rent_price: Option<Money>,
    #[serde(default)]
    pub deposit: Option<Money>,
    #[serde(default)]
    pub min_rent_time: Option<i32>,
    #[serde(default)]
    pub available_from: Option<NaiveDate>,
    #[serde(default)]
    pub available_to: Option<NaiveDate>,
    #[serde(default)]
    pub utilities: Option<Utilities>,
}

impl RentDetailsRequest {
    pub fn into_rent_details(self, property_id: Uuid) -> Result<RentDetails, FieldErrors> {
        let mut errors = FieldErrors::new();

        let rent_price = required(&mut errors, "rent_price", self.rent_price);
        let deposit = required(&mut errors, "deposit", self.deposit);
        if let Some(rent_price) = &rent_price {
            rent_price.check(&mut errors, "rent_price");
        }
        if let Some(deposit) = &deposit {
            deposit.check(&mut errors, "deposit");
        }
        if let Some(months) = self.min_rent_time {
            check_min(&mut errors, "min_rent_time", months.into(), 1);
        }
        if let (Some(from), Some(to)) = (self.available_from, self.available_to) {
            if from > to {
                errors.add(
                    "available_to",
                    "The end of availability must not precede its start.",
                );
            }
        }

        let (Some(rent_price), Some(deposit)) = (rent_price, deposit) else {
            return Err(errors);
        };
        errors.into_result()?;

        Ok(RentDetails {
            property_id,
            rent_price,
            deposit,
            min_rent_time: self.min_rent_time,
            available_from: self.available_from,
            available_to: self.available_to,
            utilities: self.utilities.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_utilities_wire_names() {
        assert_eq!(
            serde_json::to_value(Utilities::PaidByTenant).unwrap(),
            json!("paid by tenant")
        );
        let parsed: Utilities = serde_json::from_value(json!("included")).unwrap();
        assert_eq!(parsed, Utilities::Included);
        assert_eq!("paid by tenant".parse::<Utilities>().unwrap(), Utilities::PaidByTenant);
    }

    #[test]
    fn test_availability_window_must_be_ordered() {
        let request: RentDetailsRequest = serde_json::from_value(json!({
            "rent_price": { "amount": 120000, "currency": "EUR" },
            "deposit": { "amount": 240000, "currency": "EUR" },
            "available_from": "2024-09-01",
            "available_to": "2024-06-01"
        }))
        .unwrap();

        let errors = request.into_rent_details(Uuid::new_v4()).unwrap_err();
        assert_eq!(
            errors.get("available_to").unwrap(),
            ["The end of availability must not precede its start."]
        );
    }

    #[test]
    fn test_defaults() {
        let request: RentDetailsRequest = serde_json::from_value(json!({
            "rent_price": { "amount": 90000 },
            "deposit": { "amount": 90000 }
        }))
        .unwrap();

        let details = request.into_rent_details(Uuid::new_v4()).unwrap();
        assert_eq!(details.utilities, Utilities::PaidByTenant);
        assert_eq!(details.rent_price.currency, "USD");
        assert_eq!(details.min_rent_time, None);
    }
}
