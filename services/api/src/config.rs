//! Service settings

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Properties service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// Base URL used for pagination and confirmation links
    pub public_url: String,
}

impl ApiConfig {
    /// Load the configuration from environment variables
    ///
    /// # Environment Variables
    /// - `API_BIND_ADDRESS`: Listen address (default: "0.0.0.0:3001")
    /// - `API_PUBLIC_URL`: Base URL for links (default: "http://localhost")
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("bind_address", "0.0.0.0:3001")?
            .set_default("public_url", "http://localhost")?
            .add_source(Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }
}
