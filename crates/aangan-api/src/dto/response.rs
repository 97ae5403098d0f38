//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aangan_core::events::Whisper;
use aangan_realtime::metrics::MetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Success flag.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a success response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
    /// Server time.
    pub timestamp: DateTime<Utc>,
}

/// Detailed health response with broadcast core state.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedHealthResponse {
    /// Basic health fields.
    #[serde(flatten)]
    pub health: HealthResponse,
    /// Open WebSocket connections.
    pub connections: usize,
    /// Live sessions.
    pub sessions: usize,
    /// Channels holding history.
    pub channels: usize,
    /// Active subscriptions across all channels.
    pub subscriptions: usize,
    /// Messages retained per channel.
    pub history_capacity: usize,
    /// Counter snapshot.
    pub metrics: MetricsSnapshot,
}

/// Result of the whisper ingest hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponse {
    /// Channels the whisper was published to, in publish order.
    pub channels: Vec<String>,
}

/// Channel history snapshot, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelHistoryResponse {
    /// Normalised channel name.
    pub channel: String,
    /// Retained whispers, oldest first.
    pub whispers: Vec<Whisper>,
}
