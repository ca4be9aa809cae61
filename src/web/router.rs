//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::handlers::{health_check, send_estimate, AppState};
use super::middleware::{
    api_rate_limit, create_cors_layer, origin_guard, security_headers, AllowedOrigins,
    RateLimitState,
};
use crate::config::Config;

/// Create the application router.
///
/// Layers, outermost first: request tracing, security headers, CORS origin
/// check, CORS response headers and preflight, body size cap. Rate limiting
/// wraps only the `/api` routes.
pub fn create_router(
    app_state: Arc<AppState>,
    rate_limit: Arc<RateLimitState>,
    config: &Config,
) -> Router {
    let api_routes = Router::new()
        .route("/send-estimate", post(send_estimate))
        .layer(middleware::from_fn(move |req, next| {
            let state = rate_limit.clone();
            api_rate_limit(state, req, next)
        }));

    let origins = Arc::new(AllowedOrigins::new(&config.cors.allowed_origins));
    let origins_for_guard = origins.clone();

    Router::new()
        .nest("/api", api_routes)
        .merge(create_health_router())
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    let origins = origins_for_guard.clone();
                    origin_guard(origins, req, next)
                }))
                .layer(create_cors_layer(&origins))
                .layer(DefaultBodyLimit::max(config.server.body_limit_bytes)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health_check))
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}
