//! Outbound mail.
//!
//! [`MailTransport`] is the seam between request handling and delivery. The
//! production implementation, [`SmtpTransport`], wraps a pooled lettre SMTP
//! client that is built once at startup and shared by every request.

mod message;
mod transport;

pub use message::{MailBody, MailMessage};
pub use transport::{verify_in_background, DynMailTransport, MailTransport, SmtpTransport};

use std::time::Duration;

use thiserror::Error;

/// Errors raised while building or delivering mail.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}

impl MailError {
    /// Whether the failure was the relay being too slow.
    pub fn is_timeout(&self) -> bool {
        matches!(self, MailError::Timeout(_))
    }
}
