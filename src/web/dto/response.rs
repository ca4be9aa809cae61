//! Response DTOs for Web API.

use serde::Serialize;

/// Note returned when submissions are acknowledged without sending mail.
pub const EMAIL_DISABLED_NOTE: &str = "email disabled";

/// Both messages were handed to the relay.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateSentResponse {
    pub ok: bool,
    /// Message identifier of the internal lead notice.
    pub lead_id: String,
    /// Message identifier of the auto-reply.
    pub auto_id: String,
}

/// Sending is switched off; the submission was validated and dropped.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSkippedResponse {
    pub ok: bool,
    pub note: &'static str,
    /// ISO-8601 time the submission was accepted.
    pub submitted_at: String,
}

/// Successful `POST /api/send-estimate` response.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum EstimateResponse {
    Sent(EstimateSentResponse),
    Skipped(EmailSkippedResponse),
}

impl EstimateResponse {
    pub fn sent(lead_id: String, auto_id: String) -> Self {
        EstimateResponse::Sent(EstimateSentResponse {
            ok: true,
            lead_id,
            auto_id,
        })
    }

    pub fn skipped(submitted_at: String) -> Self {
        EstimateResponse::Skipped(EmailSkippedResponse {
            ok: true,
            note: EMAIL_DISABLED_NOTE,
            submitted_at,
        })
    }
}

/// Liveness check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    /// Current server time, ISO-8601.
    pub time: String,
}
