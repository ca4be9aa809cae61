//! Estimate submissions and their validation.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Raw form submission as posted by the website.
///
/// Every field is optional at this stage; [`EstimateRequest::into_lead`]
/// decides whether the submission is acceptable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EstimateRequest {
    #[serde(default, deserialize_with = "form_value")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "form_value")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "form_value")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "form_value")]
    pub city: Option<String>,
    /// Requested service type.
    #[serde(default, rename = "type", deserialize_with = "form_value")]
    pub service_type: Option<String>,
    #[serde(default, deserialize_with = "form_value")]
    pub message: Option<String>,
}

/// Accept strings and numbers (phone numbers are often posted as numbers).
/// Anything else counts as absent.
fn form_value<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Why a submission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LeadRejection {
    #[error("one or more required fields are missing")]
    MissingFields,
    #[error("email address is not valid")]
    InvalidEmail,
}

/// A submission that passed validation.
#[derive(Debug, Clone, Validate)]
pub struct Lead {
    pub name: String,
    #[validate(custom(function = "simple_email"))]
    pub email: String,
    pub phone: String,
    pub city: String,
    pub service_type: Option<String>,
    pub message: Option<String>,
}

impl EstimateRequest {
    /// Validate the submission.
    ///
    /// Missing required fields take precedence over a malformed email. This
    /// performs no I/O.
    pub fn into_lead(self) -> Result<Lead, LeadRejection> {
        let (Some(name), Some(email), Some(phone), Some(city)) = (
            present(self.name),
            present(self.email),
            present(self.phone),
            present(self.city),
        ) else {
            return Err(LeadRejection::MissingFields);
        };

        let lead = Lead {
            name,
            email,
            phone,
            city,
            service_type: present(self.service_type),
            message: present(self.message),
        };

        lead.validate().map_err(|_| LeadRejection::InvalidEmail)?;

        Ok(lead)
    }
}

/// Trimmed, sanitized value, or `None` when blank.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| sanitize_string(v.trim()))
        .filter(|v| !v.is_empty())
}

/// Remove control characters except newlines, carriage returns, and tabs.
pub fn sanitize_string(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\r' || *c == '\t')
        .collect()
}

/// `local@domain.tld`: no whitespace, exactly one `@`, and a dot inside the
/// domain with characters on both sides.
pub fn is_simple_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Validator hook for [`is_simple_email`].
pub fn simple_email(value: &str) -> Result<(), ValidationError> {
    if is_simple_email(value) {
        Ok(())
    } else {
        Err(ValidationError::new("simple_email").with_message("Invalid email address".into()))
    }
}
