//! Log output for leadmail.
//!
//! Events go to stdout and, when `logging.file` is set, are also appended to
//! that file. `RUST_LOG` takes precedence over the configured level.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::{LeadmailError, Result};

/// Parse a bare level name. Unknown names fall back to `INFO`.
fn parse_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Build the event filter.
///
/// `level` is either a bare level (`debug`) or a full directive list such as
/// `info,leadmail=debug,lettre=warn`.
fn build_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    if level.contains('=') || level.contains(',') {
        if let Ok(filter) = EnvFilter::try_new(level) {
            return filter;
        }
    }

    EnvFilter::default().add_directive(parse_level(level).into())
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(File::options().create(true).append(true).open(path)?)
}

/// Initialize logging from configuration.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let file_layer = match config.file.as_deref() {
        Some(path) => {
            let file = Arc::new(open_log_file(Path::new(path))?);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(build_filter(&config.level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(true),
        )
        .with(file_layer)
        .try_init()
        .map_err(|e| LeadmailError::Config(format!("failed to install logger: {e}")))
}

/// Initialize stdout logging only. Used when the configured file cannot be
/// opened.
pub fn init_console_only(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(build_filter(level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .try_init();
}
