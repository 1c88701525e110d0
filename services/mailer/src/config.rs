//! Worker settings

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Mail worker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MailerConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Credentials are only sent when a username is set
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    /// Use an implicit-TLS relay instead of a plain connection
    pub smtp_tls: bool,
    pub from_email: String,
    /// Name shown in subjects and bodies
    pub website_name: String,
    /// Delivery attempts per job before it is dropped
    pub max_attempts: u32,
}

impl MailerConfig {
    /// Load the configuration from environment variables
    ///
    /// # Environment Variables
    /// - `MAILER_SMTP_HOST`: SMTP server (default: "localhost")
    /// - `MAILER_SMTP_PORT`: SMTP port (default: 1025)
    /// - `MAILER_SMTP_USERNAME` / `MAILER_SMTP_PASSWORD`: Optional credentials
    /// - `MAILER_SMTP_TLS`: Connect over TLS (default: false)
    /// - `MAILER_FROM_EMAIL`: Sender address (default: "noreply@housing.local")
    /// - `MAILER_WEBSITE_NAME`: Site name used in mails (default: "Housing")
    /// - `MAILER_MAX_ATTEMPTS`: Attempts before a job is dropped (default: 3)
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("smtp_host", "localhost")?
            .set_default("smtp_port", 1025_i64)?
            .set_default("smtp_tls", false)?
            .set_default("from_email", "noreply@housing.local")?
            .set_default("website_name", "Housing")?
            .set_default("max_attempts", 3_i64)?
            .add_source(Environment::with_prefix("MAILER"))
            .build()?
            .try_deserialize()
    }
}
