//! Web server for leadmail.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::mail::{verify_in_background, DynMailTransport, SmtpTransport};
use crate::{LeadmailError, Result};

use super::handlers::AppState;
use super::middleware::RateLimitState;
use super::router::create_router;

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Per-IP rate limiter shared by all API requests.
    rate_limit: Arc<RateLimitState>,
    /// Configuration.
    config: Config,
}

impl WebServer {
    /// Create a web server with an explicit application state.
    pub fn new(config: &Config, app_state: AppState) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| {
                LeadmailError::Config(format!(
                    "invalid listen address {}:{}: {e}",
                    config.server.host, config.server.port
                ))
            })?;

        let rate_limit = Arc::new(RateLimitState::new(
            &config.rate_limit,
            config.server.trusted_proxy_hops,
        ));

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            rate_limit,
            config: config.clone(),
        })
    }

    /// Create a web server from configuration, building the SMTP transport
    /// unless email is disabled.
    pub fn from_config(config: &Config) -> Result<Self> {
        let app_state = if config.mail.disabled {
            tracing::warn!("Email sending is disabled; submissions will not be delivered");
            AppState::disabled()
        } else {
            let transport: DynMailTransport = Arc::new(SmtpTransport::from_config(&config.smtp)?);
            AppState::with_transport(config, transport)?
        };

        if config.cors.allowed_origins.is_empty() {
            tracing::warn!("ALLOWED_ORIGINS is empty; all browser origins will be rejected");
        }

        Self::new(config, app_state)
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bind the listener and start background tasks.
    async fn prepare(self) -> Result<(TcpListener, Router)> {
        let router = create_router(self.app_state.clone(), self.rate_limit.clone(), &self.config);

        let listener = TcpListener::bind(self.addr).await?;

        if let Some(transport) = self.app_state.transport() {
            verify_in_background(transport.clone());
        }

        self.rate_limit.clone().start_cleanup_task();

        tracing::info!("Web server listening on http://{}", listener.local_addr()?);

        Ok((listener, router))
    }

    /// Run the web server until Ctrl-C or SIGTERM.
    pub async fn run(self) -> Result<()> {
        let (listener, router) = self.prepare().await?;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Web server stopped");
        Ok(())
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let (listener, router) = self.prepare().await?;
        let local_addr = listener.local_addr()?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
