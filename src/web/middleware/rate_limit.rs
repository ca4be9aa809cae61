//! Per-IP rate limiting middleware.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock, middleware::StateInformationMiddleware,
    state::keyed::DefaultKeyedStateStore, Quota, RateLimiter,
};
use std::{
    num::NonZeroU32,
    sync::Arc,
    time::{Duration, Instant},
};

use super::client_ip::client_ip;
use crate::config::RateLimitConfig;
use crate::web::error::{ApiError, ErrorCode};

/// Limiter key: client IP and the index of the window the request falls in.
type WindowKey = (String, u64);

/// Rate limiter keyed by client IP and window.
pub type IpRateLimiter = RateLimiter<
    WindowKey,
    DefaultKeyedStateStore<WindowKey>,
    DefaultClock,
    StateInformationMiddleware,
>;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request admitted.
    Allowed {
        /// Requests left in the current window.
        remaining: u32,
        /// Time until the current window ends.
        reset: Duration,
    },
    /// Request refused.
    Limited {
        /// Time until the current window ends.
        retry_after: Duration,
    },
}

/// State for rate limiting.
///
/// Time is cut into fixed windows counted from startup. Each client gets
/// `max_requests` per window; the count starts over when the window ends.
/// Every (client, window) pair has its own governor cell whose quota only
/// refills once per window, so it can never admit more than `max_requests`.
pub struct RateLimitState {
    limiter: IpRateLimiter,
    started: Instant,
    max_requests: u32,
    window: Duration,
    trusted_proxy_hops: usize,
}

impl RateLimitState {
    /// Create a new rate limit state.
    pub fn new(config: &RateLimitConfig, trusted_proxy_hops: usize) -> Self {
        let max = NonZeroU32::new(config.max_requests).unwrap_or(NonZeroU32::MIN);
        let window = Duration::from_secs(config.window_secs.max(1));

        let quota = Quota::with_period(window)
            .unwrap_or_else(|| Quota::per_minute(max))
            .allow_burst(max);

        Self {
            limiter: RateLimiter::keyed(quota).with_middleware::<StateInformationMiddleware>(),
            started: Instant::now(),
            max_requests: max.get(),
            window,
            trusted_proxy_hops,
        }
    }

    /// Configured number of requests per window.
    pub fn limit(&self) -> u32 {
        self.max_requests
    }

    /// Index of the current window and the time left in it.
    fn current_window(&self) -> (u64, Duration) {
        let window = self.window.as_nanos();
        let elapsed = self.started.elapsed().as_nanos();
        let index = (elapsed / window) as u64;
        let left = (window - elapsed % window) as u64;
        (index, Duration::from_nanos(left))
    }

    /// Count a request from `ip` and decide whether it may proceed.
    pub fn check(&self, ip: &str) -> RateLimitDecision {
        let (index, reset) = self.current_window();

        match self.limiter.check_key(&(ip.to_string(), index)) {
            Ok(snapshot) => RateLimitDecision::Allowed {
                remaining: snapshot.remaining_burst_capacity(),
                reset,
            },
            Err(_) => RateLimitDecision::Limited { retry_after: reset },
        }
    }

    /// Drop cells that have refilled completely. Cells of past windows are
    /// never consulted again, so this only frees memory.
    pub fn cleanup(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Start a background task to periodically clean up idle entries.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            interval.tick().await;
            loop {
                interval.tick().await;
                self.cleanup();
                tracing::debug!(tracked = self.limiter.len(), "Rate limiter cleanup");
            }
        });
    }

    fn set_headers(&self, headers: &mut HeaderMap, remaining: u32, reset: Duration) {
        headers.insert("RateLimit-Limit", HeaderValue::from(self.max_requests));
        headers.insert("RateLimit-Remaining", HeaderValue::from(remaining));
        headers.insert("RateLimit-Reset", HeaderValue::from(ceil_secs(reset)));
    }
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Rate limiting middleware for API routes.
///
/// Adds `RateLimit-*` headers to every response; refused requests get 429
/// with `Retry-After`.
pub async fn api_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(&req, state.trusted_proxy_hops);

    match state.check(&ip) {
        RateLimitDecision::Allowed { remaining, reset } => {
            let mut response = next.run(req).await;
            state.set_headers(response.headers_mut(), remaining, reset);
            response
        }
        RateLimitDecision::Limited { retry_after } => {
            tracing::warn!(ip = %ip, "API rate limit exceeded");
            let retry_secs = ceil_secs(retry_after).max(1);
            let mut response = ApiError::new(ErrorCode::RateLimited).into_response();
            let headers = response.headers_mut();
            state.set_headers(headers, 0, retry_after);
            headers.insert("Retry-After", HeaderValue::from(retry_secs));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use tower::util::ServiceExt;

    fn state(max_requests: u32, window_secs: u64) -> RateLimitState {
        RateLimitState::new(
            &RateLimitConfig {
                max_requests,
                window_secs,
            },
            1,
        )
    }

    #[test]
    fn test_rate_limit_state_new() {
        let state = state(20, 60);
        assert_eq!(state.limit(), 20);
        assert_eq!(state.window, Duration::from_secs(60));
    }

    #[test]
    fn test_reset_is_within_window() {
        let state = state(20, 60);
        let RateLimitDecision::Allowed { remaining, reset } = state.check("10.0.0.1") else {
            panic!("first request should be allowed");
        };
        assert_eq!(remaining, 19);
        assert!(reset > Duration::from_secs(59));
        assert!(reset <= Duration::from_secs(60));
    }

    #[test]
    fn test_rate_limit_allows_max_then_refuses() {
        let state = state(3, 60);

        assert!(matches!(
            state.check("127.0.0.1"),
            RateLimitDecision::Allowed { remaining: 2, .. }
        ));
        assert!(matches!(
            state.check("127.0.0.1"),
            RateLimitDecision::Allowed { remaining: 1, .. }
        ));
        assert!(matches!(
            state.check("127.0.0.1"),
            RateLimitDecision::Allowed { remaining: 0, .. }
        ));

        // 4th request should fail
        let RateLimitDecision::Limited { retry_after } = state.check("127.0.0.1") else {
            panic!("fourth request should be limited");
        };
        assert!(retry_after <= Duration::from_secs(60));

        // Different IP should work
        assert!(matches!(
            state.check("192.168.1.1"),
            RateLimitDecision::Allowed { .. }
        ));
    }

    #[test]
    fn test_twentieth_allowed_twenty_first_refused() {
        let state = state(20, 60);
        for i in 1..=20 {
            assert!(
                matches!(state.check("10.0.0.1"), RateLimitDecision::Allowed { .. }),
                "request {i} should be allowed"
            );
        }
        assert!(matches!(
            state.check("10.0.0.1"),
            RateLimitDecision::Limited { .. }
        ));
    }

    #[test]
    fn test_no_refill_inside_window() {
        let state = state(20, 60);
        for _ in 0..20 {
            assert!(matches!(state.check("10.0.0.1"), RateLimitDecision::Allowed { .. }));
        }

        // Longer than one request's share of the window.
        std::thread::sleep(Duration::from_millis(3100));

        assert!(matches!(
            state.check("10.0.0.1"),
            RateLimitDecision::Limited { .. }
        ));
    }

    #[test]
    fn test_allowance_restored_in_next_window() {
        let state = state(2, 1);
        assert!(matches!(state.check("10.0.0.1"), RateLimitDecision::Allowed { .. }));
        assert!(matches!(state.check("10.0.0.1"), RateLimitDecision::Allowed { .. }));
        let RateLimitDecision::Limited { retry_after } = state.check("10.0.0.1") else {
            panic!("third request should be limited");
        };
        assert!(retry_after <= Duration::from_secs(1));

        std::thread::sleep(retry_after + Duration::from_millis(50));

        assert!(matches!(
            state.check("10.0.0.1"),
            RateLimitDecision::Allowed { remaining: 1, .. }
        ));
    }

    #[test]
    fn test_cleanup_keeps_active_clients_limited() {
        let state = state(1, 60);
        assert!(matches!(state.check("10.0.0.1"), RateLimitDecision::Allowed { .. }));
        state.cleanup();
        assert!(matches!(state.check("10.0.0.1"), RateLimitDecision::Limited { .. }));
    }

    #[test]
    fn test_ceil_secs() {
        assert_eq!(ceil_secs(Duration::from_millis(0)), 0);
        assert_eq!(ceil_secs(Duration::from_millis(1)), 1);
        assert_eq!(ceil_secs(Duration::from_millis(3000)), 3);
        assert_eq!(ceil_secs(Duration::from_millis(3001)), 4);
    }

    #[tokio::test]
    async fn test_middleware_headers_and_rejection() {
        let state = Arc::new(state(1, 60));
        let app = Router::new()
            .route("/", get(|| async { "OK" }))
            .layer(middleware::from_fn(move |req, next| {
                api_rate_limit(state.clone(), req, next)
            }));

        let request = || {
            Request::builder()
                .uri("/")
                .header("X-Forwarded-For", "203.0.113.9")
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("RateLimit-Limit").unwrap(), "1");
        assert_eq!(response.headers().get("RateLimit-Remaining").unwrap(), "0");

        let response = app.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("Retry-After"));
        assert_eq!(response.headers().get("RateLimit-Remaining").unwrap(), "0");
    }
}
