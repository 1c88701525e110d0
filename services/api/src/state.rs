//! Application state shared across handlers

use common::jwt::JwtService;

use crate::properties::PropertyService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub properties: PropertyService,
    pub jwt_service: JwtService,
}
