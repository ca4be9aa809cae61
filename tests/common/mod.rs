//! Test helpers for Web API integration tests.
//!
//! Provides in-process mail transports and a router factory so tests never
//! touch a real SMTP relay.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;
use serde_json::{json, Value};

use leadmail::config::Config;
use leadmail::mail::{DynMailTransport, MailError, MailMessage, MailTransport};
use leadmail::web::create_router;
use leadmail::web::handlers::AppState;
use leadmail::web::middleware::RateLimitState;

/// Origin allowed by [`create_test_config`].
pub const ALLOWED_ORIGIN: &str = "https://www.example.com";

/// Create a test configuration with email enabled.
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.cors.allowed_origins = vec![ALLOWED_ORIGIN.to_string()];
    config.smtp.host = "smtp.example.com".to_string();
    config.smtp.user = Some("mailer@example.com".to_string());
    config.smtp.password = Some("secret".to_string());
    config.mail.from_name = "Example Roofing".to_string();
    config.mail.leads_to = "leads@example.com".to_string();
    config.mail.send_timeout_ms = 300;
    config
}

/// A complete, valid submission.
pub fn valid_submission() -> Value {
    json!({
        "name": "Jane Doe",
        "email": "jane@customer.example",
        "phone": "555-0100",
        "city": "Springfield",
        "type": "Roof repair",
        "message": "Water coming in <b>near</b> the chimney"
    })
}

/// Records every message and returns a fresh `Message-ID` for each.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<MailMessage>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: &MailMessage) -> Result<String, MailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(message.new_message_id())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Fails every send the way an unreachable or misconfigured relay would.
pub struct FailingTransport;

#[async_trait]
impl MailTransport for FailingTransport {
    async fn send(&self, _message: &MailMessage) -> Result<String, MailError> {
        Err(MailError::Smtp(
            "535 5.7.8 authentication failed for relay.internal:587".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Never answers, like a relay that accepts the connection and stalls.
pub struct HangingTransport {
    pub calls: AtomicUsize,
}

impl HangingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl MailTransport for HangingTransport {
    async fn send(&self, _message: &MailMessage) -> Result<String, MailError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    fn name(&self) -> &str {
        "hanging"
    }
}

/// Build a test server around `transport` using `config`.
///
/// The transport is wired in even when `mail.disabled` is set, so tests can
/// check that nothing reaches it.
pub fn create_test_server(config: &Config, transport: DynMailTransport) -> TestServer {
    let app_state =
        AppState::with_transport(config, transport).expect("Failed to build app state");

    let rate_limit = Arc::new(RateLimitState::new(
        &config.rate_limit,
        config.server.trusted_proxy_hops,
    ));

    let router = create_router(Arc::new(app_state), rate_limit, config);

    TestServer::new(router).expect("Failed to create test server")
}
