//! API handlers and shared state.

pub mod estimate;
pub mod health;

pub use estimate::*;
pub use health::*;

use std::time::Duration;

use crate::config::Config;
use crate::estimate::Sender;
use crate::mail::{DynMailTransport, MailError};

/// Outbound mail wiring for accepted submissions.
pub struct Mailer {
    pub transport: DynMailTransport,
    pub sender: Sender,
    /// Bound on sending both messages of one request.
    pub send_timeout: Duration,
}

/// Application state shared by all handlers. Read-only after construction.
pub struct AppState {
    /// Acknowledge submissions without sending, even when a mailer exists.
    pub email_disabled: bool,
    /// Absent when email is disabled and no relay is configured.
    pub mailer: Option<Mailer>,
}

impl AppState {
    /// State that acknowledges submissions without sending mail.
    pub fn disabled() -> Self {
        Self {
            email_disabled: true,
            mailer: None,
        }
    }

    /// State that delivers through `transport` unless `mail.disabled` is set.
    pub fn with_transport(config: &Config, transport: DynMailTransport) -> Result<Self, MailError> {
        Ok(Self {
            email_disabled: config.mail.disabled,
            mailer: Some(Mailer {
                transport,
                sender: Sender::from_config(config)?,
                send_timeout: config.mail.send_timeout(),
            }),
        })
    }

    /// The mailer to use for a submission, or `None` when sending is off.
    pub fn active_mailer(&self) -> Option<&Mailer> {
        if self.email_disabled {
            return None;
        }
        self.mailer.as_ref()
    }

    /// The mail transport, when sending is enabled.
    pub fn transport(&self) -> Option<&DynMailTransport> {
        self.active_mailer().map(|mailer| &mailer.transport)
    }
}
