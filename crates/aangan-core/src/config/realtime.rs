//! Real-time broadcast engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Real-time (pub/sub + WebSocket) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Messages retained per channel for replay to late subscribers.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Idle age after which a channel with no subscribers is evicted.
    /// `None` disables eviction.
    #[serde(default)]
    pub channel_idle_eviction_seconds: Option<u64>,
    /// How often the eviction sweeper runs.
    #[serde(default = "default_sweep_interval")]
    pub eviction_sweep_interval_seconds: u64,
    /// Maximum channel subscriptions held by one session.
    #[serde(default = "default_max_subscriptions")]
    pub max_subscriptions_per_session: usize,
    /// Maximum subscribers on a single channel.
    #[serde(default = "default_max_subscribers")]
    pub max_subscribers_per_channel: usize,
    /// Per-connection outbound queue length.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
    /// WebSocket ping interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Seconds without inbound traffic before a connection is dropped.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_seconds: u64,
    /// Whether clients may publish directly over the socket.
    #[serde(default)]
    pub allow_client_publish: bool,
    /// Replay history when a subscribe request does not say otherwise.
    #[serde(default = "default_true")]
    pub replay_on_subscribe: bool,
    /// Shared secret expected on the whisper ingest hook.
    #[serde(default)]
    pub ingest_token: Option<String>,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            channel_idle_eviction_seconds: None,
            eviction_sweep_interval_seconds: default_sweep_interval(),
            max_subscriptions_per_session: default_max_subscriptions(),
            max_subscribers_per_channel: default_max_subscribers(),
            outbound_buffer_size: default_outbound_buffer(),
            ping_interval_seconds: default_ping_interval(),
            ping_timeout_seconds: default_ping_timeout(),
            allow_client_publish: false,
            replay_on_subscribe: true,
            ingest_token: None,
        }
    }
}

impl RealtimeConfig {
    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.history_capacity == 0 {
            return Err(AppError::configuration(
                "realtime.history_capacity must be at least 1",
            ));
        }
        if self.max_subscriptions_per_session == 0 {
            return Err(AppError::configuration(
                "realtime.max_subscriptions_per_session must be at least 1",
            ));
        }
        if self.outbound_buffer_size == 0 {
            return Err(AppError::configuration(
                "realtime.outbound_buffer_size must be at least 1",
            ));
        }
        // A full replay plus the subscribe ack must fit in the send queue.
        if self.history_capacity >= self.outbound_buffer_size {
            return Err(AppError::configuration(format!(
                "realtime.outbound_buffer_size ({}) must exceed history_capacity ({})",
                self.outbound_buffer_size, self.history_capacity
            )));
        }
        Ok(())
    }

    /// Idle eviction age, if eviction is enabled.
    pub fn idle_eviction(&self) -> Option<Duration> {
        self.channel_idle_eviction_seconds.map(Duration::from_secs)
    }

    /// Interval between eviction sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_sweep_interval_seconds.max(1))
    }

    /// Interval between heartbeat pings.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds.max(1))
    }

    /// Inactivity timeout for a connection.
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_seconds.max(1))
    }
}

fn default_history_capacity() -> usize {
    50
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_max_subscriptions() -> usize {
    32
}

fn default_max_subscribers() -> usize {
    10_000
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    25
}

fn default_ping_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}
