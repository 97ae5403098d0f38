//! Application assembly and the HTTP server loop.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::middleware as axum_middleware;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use aangan_core::config::AppConfig;
use aangan_core::error::AppError;
use aangan_realtime::server::RealtimeEngine;

use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::router::build_router;
use crate::state::AppState;

/// Maximum HTTP request body accepted on any route.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Builds the router with all middleware applied.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);

    build_router(state)
        .layer(axum_middleware::from_fn(request_logging))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Binds the configured address and serves until Ctrl-C.
///
/// On shutdown the engine disconnects every live session before in-flight
/// HTTP requests are given `shutdown_grace_seconds` to finish.
pub async fn run_server(config: AppConfig, realtime: Arc<RealtimeEngine>) -> Result<(), AppError> {
    let addr = config.server.bind_address();
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let state = AppState::new(config, Arc::clone(&realtime));
    let app = build_app(state);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    info!(address = %addr, "Aangan server listening");

    let shutdown_engine = Arc::clone(&realtime);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        shutdown_engine.shutdown();
    });

    let mut server = tokio::spawn(async move { server.await });
    let mut shutdown_rx = realtime.shutdown_receiver();

    tokio::select! {
        result = &mut server => {
            return result
                .map_err(|e| AppError::internal(format!("Server task failed: {e}")))?
                .map_err(|e| AppError::internal(format!("Server error: {e}")));
        }
        _ = shutdown_rx.recv() => {}
    }

    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => result
            .map_err(|e| AppError::internal(format!("Server task failed: {e}")))?
            .map_err(|e| AppError::internal(format!("Server error: {e}")))?,
        Err(_) => warn!(
            grace_seconds = grace.as_secs(),
            "Graceful shutdown timed out, abandoning in-flight requests"
        ),
    }

    info!("Server shut down gracefully");
    Ok(())
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, starting graceful shutdown"),
        Err(e) => {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
