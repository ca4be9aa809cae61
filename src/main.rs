use std::process::ExitCode;

use tracing::{error, info};

use leadmail::{Config, WebServer};

#[tokio::main]
async fn main() -> ExitCode {
    let path = std::env::var("LEADMAIL_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

    let config = match Config::load_with_env(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = leadmail::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        leadmail::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("{e}");
        return ExitCode::FAILURE;
    }

    info!(
        "leadmail starting on {}:{}",
        config.server.host, config.server.port
    );

    let server = match WebServer::from_config(&config) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start: {e}");
            return ExitCode::FAILURE;
        }
    };

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Web server error: {e}");
            ExitCode::FAILURE
        }
    }
}
