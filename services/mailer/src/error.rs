//! Error types for the mail worker

use common::error::QueueError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Invalid message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

impl MailerError {
    /// Whether sending the same job again could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, MailerError::Delivery(_) | MailerError::Queue(_))
    }
}

pub type MailerResult<T> = Result<T, MailerError>;
