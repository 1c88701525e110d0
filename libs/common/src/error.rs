//! Custom error types for the common library
//!
//! This module defines the error types shared by the services: database
//! failures, mail queue failures and signed token failures.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// PostgreSQL SQLSTATE for `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

impl DatabaseError {
    /// Classify a query error, splitting out unique violations so callers
    /// can report them as field errors.
    pub fn from_query(err: SqlxError) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let constraint = db_err.constraint().unwrap_or_default().to_string();
                return DatabaseError::UniqueViolation(constraint);
            }
        }
        DatabaseError::Query(err)
    }
}

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        DatabaseError::from_query(err)
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Errors raised by the mail queue
#[derive(Error, Debug)]
pub enum QueueError {
    /// The broker could not be reached or rejected the command
    #[error("Broker error: {0}")]
    Broker(#[from] redis::RedisError),

    /// A queued payload could not be encoded or decoded
    #[error("Invalid queue payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Errors raised while issuing or verifying signed tokens
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token was well formed but its lifetime is over
    #[error("Token expired")]
    Expired,

    /// Bad signature, malformed payload or wrong purpose
    #[error("Invalid token")]
    Invalid,

    /// The token could not be produced
    #[error("Token encoding error: {0}")]
    Encoding(String),

    /// Missing or unusable signing configuration
    #[error("Token configuration error: {0}")]
    Configuration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_is_a_query_error() {
        let err = DatabaseError::from_query(SqlxError::RowNotFound);
        assert!(matches!(err, DatabaseError::Query(SqlxError::RowNotFound)));
    }

    #[test]
    fn test_token_error_messages() {
        assert_eq!(TokenError::Expired.to_string(), "Token expired");
        assert_eq!(TokenError::Invalid.to_string(), "Invalid token");
    }
}
