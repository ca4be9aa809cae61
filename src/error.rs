//! Error types for leadmail.

use thiserror::Error;

use crate::mail::MailError;

/// Common error type for leadmail.
#[derive(Error, Debug)]
pub enum LeadmailError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    ///
    /// Raised while loading or validating configuration at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Mail transport error.
    #[error("mail error: {0}")]
    Mail(#[from] MailError),
}

/// Result type alias for leadmail operations.
pub type Result<T> = std::result::Result<T, LeadmailError>;
