//! Mail transport trait and SMTP implementation.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::PoolConfig;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use super::{MailError, MailMessage};
use crate::config::{SmtpConfig, TlsMode};

/// Async mail delivery.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver one message and return its message identifier.
    async fn send(&self, message: &MailMessage) -> Result<String, MailError>;

    /// Check that the backend is reachable.
    async fn verify(&self) -> Result<(), MailError> {
        Ok(())
    }

    /// Short human-readable name for logs.
    fn name(&self) -> &str;
}

/// Shared transport handle injected into request handlers.
pub type DynMailTransport = Arc<dyn MailTransport>;

/// SMTP relay transport backed by a lettre connection pool.
#[derive(Clone)]
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpTransport {
    /// Create a transport from configuration. No connection is opened here.
    pub fn from_config(config: &SmtpConfig) -> Result<Self, MailError> {
        let mut builder = match config.tls {
            TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
            TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::Smtp(e.to_string()))?,
            TlsMode::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::Smtp(e.to_string()))?,
        };

        if config.accept_invalid_certs && config.tls != TlsMode::None {
            tracing::warn!(
                host = %config.host,
                "SMTP certificate verification is disabled"
            );
            let params = TlsParameters::builder(config.host.clone())
                .dangerous_accept_invalid_certs(true)
                .build()
                .map_err(|e| MailError::Smtp(e.to_string()))?;
            builder = builder.tls(match config.tls {
                TlsMode::Tls => Tls::Wrapper(params),
                _ => Tls::Required(params),
            });
        }

        builder = builder
            .port(config.port)
            .timeout(Some(config.timeout()))
            .pool_config(PoolConfig::new().max_size(config.pool_size.max(1)));

        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            host: config.host.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, message: &MailMessage) -> Result<String, MailError> {
        let message_id = message.new_message_id();
        let email = message.to_lettre(&message_id)?;

        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        tracing::debug!(
            message_id = %message_id,
            code = %response.code(),
            "Relay accepted message"
        );

        Ok(message_id)
    }

    async fn verify(&self) -> Result<(), MailError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MailError::Smtp(format!(
                "{} did not answer the connection test",
                self.host
            ))),
            Err(e) => Err(MailError::Smtp(e.to_string())),
        }
    }

    fn name(&self) -> &str {
        "smtp"
    }
}

/// Run a connectivity check without blocking startup.
///
/// The outcome is only logged; a failing relay never stops the server.
pub fn verify_in_background(transport: DynMailTransport) {
    tokio::spawn(async move {
        match transport.verify().await {
            Ok(()) => tracing::info!(transport = transport.name(), "Mail transport ready"),
            Err(e) => tracing::warn!(
                transport = transport.name(),
                error = %e,
                "Mail transport verification failed; sends may fail"
            ),
        }
    });
}
