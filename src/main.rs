//! Aangan Server: real-time whisper broadcast for campus zones.
//!
//! Main entry point that wires the crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use aangan_api::app::run_server;
use aangan_core::config::AppConfig;
use aangan_core::error::AppError;
use aangan_realtime::server::RealtimeEngine;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration for the environment named by `AANGAN_ENV`.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("AANGAN_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Aangan");

    let realtime = Arc::new(RealtimeEngine::new(config.realtime.clone()));
    let sweeper = realtime.start_background_tasks();

    run_server(config, Arc::clone(&realtime)).await?;

    if let Some(sweeper) = sweeper {
        let _ = sweeper.await;
    }
    Ok(())
}
