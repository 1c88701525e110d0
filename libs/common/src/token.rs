//! Signed, time-limited email tokens
//!
//! Activation links, password reset links and agent assignment links carry
//! an HS256 token naming an email address and the purpose it was issued
//! for. Tokens live for [`EMAIL_TOKEN_LIFETIME_SECS`] with no leeway.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::error::TokenError;
use crate::jwt::unix_now;

/// Sixty minutes
pub const EMAIL_TOKEN_LIFETIME_SECS: u64 = 60 * 60;

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Activation,
    PasswordReset,
    AgentAssignment,
}

#[derive(Debug, Serialize, Deserialize)]
struct EmailClaims {
    email: String,
    purpose: TokenPurpose,
    iat: u64,
    exp: u64,
}

/// Issues and verifies email tokens
#[derive(Clone)]
pub struct EmailTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl EmailTokenService {
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::Configuration(
                "SECRET_KEY must not be empty".to_string(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Build the service from `SECRET_KEY`
    pub fn from_env() -> Result<Self, TokenError> {
        let secret = std::env::var("SECRET_KEY").map_err(|_| {
            TokenError::Configuration("SECRET_KEY environment variable not set".to_string())
        })?;
        Self::new(&secret)
    }

    /// Issue a token for `email`, valid for the next sixty minutes
    pub fn issue(&self, email: &str, purpose: TokenPurpose) -> Result<String, TokenError> {
        self.issue_at(email, purpose, unix_now()?)
    }

    /// Issue a token as if it had been created at `issued_at` (unix seconds)
    pub fn issue_at(
        &self,
        email: &str,
        purpose: TokenPurpose,
        issued_at: u64,
    ) -> Result<String, TokenError> {
        let claims = EmailClaims {
            email: email.to_string(),
            purpose,
            iat: issued_at,
            exp: issued_at + EMAIL_TOKEN_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Check a token and return the email it was issued for
    ///
    /// A token issued for another purpose is reported as invalid.
    pub fn verify(&self, token: &str, purpose: TokenPurpose) -> Result<String, TokenError> {
        let claims = decode::<EmailClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?
            .claims;

        if claims.purpose != purpose {
            return Err(TokenError::Invalid);
        }
        Ok(claims.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn tokens() -> EmailTokenService {
        EmailTokenService::new("test-secret-key").unwrap()
    }

    #[test]
    fn test_verify_returns_email() {
        let service = tokens();
        let token = service
            .issue("testuser@something.com", TokenPurpose::Activation)
            .unwrap();
        assert_eq!(
            service.verify(&token, TokenPurpose::Activation).unwrap(),
            "testuser@something.com"
        );
    }

    #[test]
    fn test_token_older_than_an_hour_is_expired() {
        let service = tokens();
        let issued_at = unix_now().unwrap() - EMAIL_TOKEN_LIFETIME_SECS - 1;
        let token = service
            .issue_at("a@example.com", TokenPurpose::Activation, issued_at)
            .unwrap();

        assert_eq!(
            service.verify(&token, TokenPurpose::Activation),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_token_within_the_hour_is_accepted() {
        let service = tokens();
        let issued_at = unix_now().unwrap() - EMAIL_TOKEN_LIFETIME_SECS + 30;
        let token = service
            .issue_at("a@example.com", TokenPurpose::PasswordReset, issued_at)
            .unwrap();

        assert!(service.verify(&token, TokenPurpose::PasswordReset).is_ok());
    }

    #[test]
    fn test_activation_token_cannot_reset_password() {
        let service = tokens();
        let token = service
            .issue("a@example.com", TokenPurpose::Activation)
            .unwrap();

        assert_eq!(
            service.verify(&token, TokenPurpose::PasswordReset),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let token = tokens()
            .issue("a@example.com", TokenPurpose::Activation)
            .unwrap();
        let other = EmailTokenService::new("another-key").unwrap();

        assert_eq!(
            other.verify(&token, TokenPurpose::Activation),
            Err(TokenError::Invalid)
        );
        assert_eq!(
            tokens().verify("not.a.token", TokenPurpose::Activation),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    #[serial]
    fn test_from_env_requires_secret_key() {
        unsafe {
            std::env::remove_var("SECRET_KEY");
        }
        assert!(matches!(
            EmailTokenService::from_env(),
            Err(TokenError::Configuration(_))
        ));

        unsafe {
            std::env::set_var("SECRET_KEY", "from-env");
        }
        assert!(EmailTokenService::from_env().is_ok());

        unsafe {
            std::env::remove_var("SECRET_KEY");
        }
    }
}
