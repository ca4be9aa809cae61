//! Date/time utilities for leadmail.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as ISO-8601 with millisecond precision and a `Z`
/// suffix, e.g. `2024-05-01T14:03:22.517Z`.
pub fn format_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in the same format as [`format_iso`].
pub fn now_iso() -> String {
    format_iso(&Utc::now())
}
