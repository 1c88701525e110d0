//! Service settings

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Authentication service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// Base URL used to build links sent by email
    pub public_url: String,
}

impl AuthConfig {
    /// Load the configuration from environment variables
    ///
    /// # Environment Variables
    /// - `AUTH_BIND_ADDRESS`: Listen address (default: "0.0.0.0:3000")
    /// - `AUTH_PUBLIC_URL`: Base URL for activation and reset links (default: "http://localhost")
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("bind_address", "0.0.0.0:3000")?
            .set_default("public_url", "http://localhost")?
            .add_source(Environment::with_prefix("AUTH"))
            .build()?
            .try_deserialize()
    }
}
