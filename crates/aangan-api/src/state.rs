//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use aangan_core::config::AppConfig;
use aangan_realtime::server::RealtimeEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Broadcast engine
    pub realtime: Arc<RealtimeEngine>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Builds state around an already constructed engine.
    pub fn new(config: AppConfig, realtime: Arc<RealtimeEngine>) -> Self {
        Self {
            config: Arc::new(config),
            realtime,
            started_at: Instant::now(),
        }
    }
}
