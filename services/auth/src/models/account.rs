//! Request and response payloads for the account lifecycle
//!
//! Request fields are optional so that a missing field is reported as a
//! field error instead of a deserialization failure.

use serde::{Deserialize, Serialize};

/// Signup payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Signup response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupResponse {
    pub email: String,
    pub username: String,
}

/// `?token=` query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivateQuery {
    #[serde(default)]
    pub token: Option<String>,
}

pub type TokenQuery = ActivateQuery;

/// Confirmation code payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyEmailRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Payload carrying only an email address
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// Credentials for token issuance
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Access and refresh token pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Refresh payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenString {
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// New password with its confirmation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub new: Option<String>,
    #[serde(default)]
    pub new_retype: Option<String>,
}

/// Password change for an authenticated user
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old: Option<String>,
    #[serde(default)]
    pub new: Option<String>,
    #[serde(default)]
    pub new_retype: Option<String>,
}
