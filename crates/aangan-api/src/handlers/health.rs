//! Health check handlers.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{ApiResponse, DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

fn basic_health(state: &AppState) -> HealthResponse {
    HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now(),
    }
}

/// GET /api/health
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(basic_health(&state)))
}

/// GET /api/health/detailed
pub async fn detailed_health(
    State(state): State<AppState>,
) -> Json<ApiResponse<DetailedHealthResponse>> {
    let realtime = &state.realtime;

    Json(ApiResponse::ok(DetailedHealthResponse {
        health: basic_health(&state),
        connections: realtime.transport.connection_count(),
        sessions: realtime.sessions.session_count(),
        channels: realtime.pubsub.channel_count(),
        subscriptions: realtime.pubsub.total_subscriptions(),
        history_capacity: realtime.pubsub.history_capacity(),
        metrics: realtime.metrics.snapshot(),
    }))
}
