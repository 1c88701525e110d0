//! Property pictures

use chrono::{DateTime, Utc};
use common::validation::FieldErrors;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::required_text;

const IMAGE_MAX_LENGTH: usize = 1024;

/// A stored picture of a property; at most one per property is `main`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub id: Uuid,
    #[serde(skip)]
    pub property_id: Uuid,
    /// Storage path or URL of the file
    pub image: String,
    pub main: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub main: Option<bool>,
}

impl ImageRequest {
    pub fn into_image(self, property_id: Uuid) -> Result<Image, FieldErrors> {
        let mut errors = FieldErrors::new();
        let image = required_text(&mut errors, "image", self.image, IMAGE_MAX_LENGTH);
        errors.into_result()?;

        Ok(Image {
            id: Uuid::new_v4(),
            property_id,
            image,
            main: self.main.unwrap_or(false),
            created_at: Utc::now(),
        })
    }
}
