//! API error handling.
//!
//! Every failure is rendered as `{"ok": false, "error": "<CODE>"}`. Details
//! stay in the server log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::estimate::LeadRejection;
use crate::mail::MailError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A required form field is absent or blank (400).
    MissingFields,
    /// The email field fails the address check (400).
    InvalidEmail,
    /// The body is not valid JSON (400).
    InvalidJson,
    /// CORS origin is not allow-listed (403).
    CorsNotAllowed,
    /// Unknown route (404).
    NotFound,
    /// Body exceeds the size cap (413).
    PayloadTooLarge,
    /// Per-IP rate limit exceeded (429).
    RateLimited,
    /// Relay failure (502) or timeout (504).
    MailSendFailed,
}

impl ErrorCode {
    /// Get the default HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::MissingFields | ErrorCode::InvalidEmail | ErrorCode::InvalidJson => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::CorsNotAllowed => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::MailSendFailed => StatusCode::BAD_GATEWAY,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Always `false`.
    pub ok: bool,
    /// Error code.
    pub error: ErrorCode,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    status: StatusCode,
}

impl ApiError {
    /// Create an error with the code's default status.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            status: code.status_code(),
        }
    }

    /// Delivery failure. Timeouts map to 504, everything else to 502.
    pub fn mail_send_failed(timed_out: bool) -> Self {
        Self {
            code: ErrorCode::MailSendFailed,
            status: if timed_out {
                StatusCode::GATEWAY_TIMEOUT
            } else {
                StatusCode::BAD_GATEWAY
            },
        }
    }

    pub fn not_found() -> Self {
        Self::new(ErrorCode::NotFound)
    }

    /// Error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            ok: false,
            error: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({})", self.code, self.status)
    }
}

impl std::error::Error for ApiError {}

impl From<LeadRejection> for ApiError {
    fn from(rejection: LeadRejection) -> Self {
        match rejection {
            LeadRejection::MissingFields => ApiError::new(ErrorCode::MissingFields),
            LeadRejection::InvalidEmail => ApiError::new(ErrorCode::InvalidEmail),
        }
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        tracing::error!(error = %err, "Mail delivery failed");
        ApiError::mail_send_failed(err.is_timeout())
    }
}
