//! CORS policy.
//!
//! Requests without an `Origin` header (curl, server-to-server) always pass.
//! Browser requests must come from an allow-listed origin; anything else is
//! refused with `CORS_NOT_ALLOWED` before it reaches a handler.

use axum::{
    body::Body,
    http::header::{ACCEPT, CONTENT_TYPE, ORIGIN},
    http::{HeaderValue, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashSet;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::web::error::{ApiError, ErrorCode};

/// Exact-match origin allow-list.
#[derive(Debug, Clone, Default)]
pub struct AllowedOrigins(HashSet<String>);

impl AllowedOrigins {
    /// Build from configured origins. Trailing slashes are dropped because
    /// browsers never send them.
    pub fn new(origins: &[String]) -> Self {
        Self(
            origins
                .iter()
                .map(|o| o.trim().trim_end_matches('/').to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, origin: &str) -> bool {
        self.0.contains(origin)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn header_values(&self) -> Vec<HeaderValue> {
        self.0.iter().filter_map(|o| o.parse().ok()).collect()
    }
}

/// Create the CORS response-header layer for allow-listed origins.
///
/// Also answers preflight `OPTIONS` requests, so they never reach the rate
/// limiter.
pub fn create_cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT])
        .allow_origin(origins.header_values())
}

/// Reject requests whose `Origin` is present but not allow-listed.
pub async fn origin_guard(
    origins: Arc<AllowedOrigins>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(origin) = req.headers().get(ORIGIN) {
        let allowed = origin
            .to_str()
            .map(|o| origins.contains(o))
            .unwrap_or(false);

        if !allowed {
            tracing::warn!(origin = ?origin, path = %req.uri().path(), "CORS origin rejected");
            return ApiError::new(ErrorCode::CorsNotAllowed).into_response();
        }
    }

    next.run(req).await
}
