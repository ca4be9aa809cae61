//! Liveness check.

use axum::Json;

use crate::datetime::now_iso;
use crate::web::dto::HealthResponse;

/// GET /health - Liveness check. Never touches the mail transport.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        time: now_iso(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let Json(response) = health_check().await;
        assert!(response.ok);
        assert!(response.time.ends_with('Z'));
    }
}
