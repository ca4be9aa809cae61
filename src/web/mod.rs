//! HTTP surface.
//!
//! `GET /health` for liveness and `POST /api/send-estimate` for form
//! submissions, behind CORS, security headers, a body size cap and per-IP
//! rate limiting on `/api`.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
