//! Request body extraction for Web API handlers.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
};
use serde::de::DeserializeOwned;

use crate::web::error::{ApiError, ErrorCode};

/// A lenient JSON extractor for form submissions.
///
/// - an empty body yields `T::default()`, so a bare POST is treated as a
///   submission with every field absent
/// - a body over the router's `DefaultBodyLimit` is rejected with
///   `PAYLOAD_TOO_LARGE`
/// - anything that does not parse is rejected with `INVALID_JSON`
///
/// The Content-Type header is not inspected.
///
/// # Example
///
/// ```ignore
/// async fn submit(FormJson(payload): FormJson<EstimateRequest>) -> Result<..., ApiError> {
///     let lead = payload.into_lead()?;
///     // ...
/// }
/// ```
pub struct FormJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for FormJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                tracing::warn!("Request body exceeds size limit");
                ApiError::new(ErrorCode::PayloadTooLarge)
            } else {
                tracing::debug!(error = %e, "Failed to read request body");
                ApiError::new(ErrorCode::InvalidJson)
            }
        })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(FormJson(T::default()));
        }

        serde_json::from_slice(&bytes).map(FormJson).map_err(|e| {
            tracing::debug!(error = %e, "Malformed JSON body");
            ApiError::new(ErrorCode::InvalidJson)
        })
    }
}
