//! leadmail - lead-generation form backend.
//!
//! Accepts estimate requests from a website contact form, validates them and
//! sends two emails through an SMTP relay: a notice to the business inbox and
//! an acknowledgment to the submitter.

pub mod config;
pub mod datetime;
pub mod error;
pub mod estimate;
pub mod logging;
pub mod mail;
pub mod web;

pub use config::Config;
pub use error::{LeadmailError, Result};
pub use estimate::{EstimateRequest, Lead, LeadRejection};
pub use mail::{DynMailTransport, MailError, MailMessage, MailTransport, SmtpTransport};
pub use web::WebServer;
