//! Perimeter middleware for the Web API.

pub mod client_ip;
pub mod cors;
pub mod rate_limit;
pub mod security;

pub use client_ip::client_ip;
pub use cors::{create_cors_layer, origin_guard, AllowedOrigins};
pub use rate_limit::{api_rate_limit, RateLimitDecision, RateLimitState};
pub use security::security_headers;
