//! Ping/pong heartbeat for WebSocket keepalive.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time;

use aangan_core::config::RealtimeConfig;

use super::handle::ConnectionHandle;
use crate::channel::subscription::DeliveryError;
use crate::message::types::OutboundMessage;

/// Heartbeat configuration
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub ping_interval: Duration,
    /// Inbound silence after which the connection is considered dead
    pub ping_timeout: Duration,
}

impl From<&RealtimeConfig> for HeartbeatConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: config.ping_interval(),
            ping_timeout: config.ping_timeout(),
        }
    }
}

/// Run heartbeat loop for a connection.
///
/// Sends periodic pings and marks the connection dead once it has been
/// silent for longer than the timeout. Ends when the connection dies or
/// shutdown is signalled.
pub async fn run_heartbeat(
    handle: Arc<ConnectionHandle>,
    config: HeartbeatConfig,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut interval = time::interval(config.ping_interval);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = handle.closed() => break,
            _ = shutdown.recv() => break,
        }

        let idle = handle.idle_for();
        if idle > config.ping_timeout {
            tracing::warn!(
                conn_id = %handle.id,
                idle_seconds = idle.as_secs(),
                "Heartbeat timeout, closing connection"
            );
            handle.mark_dead();
            break;
        }

        let ping = OutboundMessage::Ping {
            timestamp: Utc::now().timestamp_millis(),
        };
        if let Err(DeliveryError::Closed) = handle.send_message(&ping) {
            tracing::debug!(conn_id = %handle.id, "Ping send failed, connection closed");
            break;
        }
    }

    tracing::debug!(conn_id = %handle.id, "Heartbeat loop ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn config() -> HeartbeatConfig {
        HeartbeatConfig {
            ping_interval: Duration::from_secs(10),
            ping_timeout: Duration::from_secs(25),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pings_then_times_out() {
        let (tx, mut rx) = mpsc::channel(16);
        let handle = Arc::new(ConnectionHandle::new(Uuid::new_v4(), Uuid::new_v4(), tx));
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(run_heartbeat(Arc::clone(&handle), config(), shutdown_rx));
        task.await.unwrap();

        assert!(!handle.is_alive());
        let mut pings = 0;
        while let Ok(frame) = rx.try_recv() {
            assert!(frame.contains(r#""type":"ping""#));
            pings += 1;
        }
        assert_eq!(pings, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_keeps_connection_alive() {
        let (tx, _rx) = mpsc::channel(64);
        let handle = Arc::new(ConnectionHandle::new(Uuid::new_v4(), Uuid::new_v4(), tx));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(run_heartbeat(Arc::clone(&handle), config(), shutdown_rx));
        for _ in 0..6 {
            time::sleep(Duration::from_secs(10)).await;
            handle.touch();
        }
        assert!(handle.is_alive());

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
        assert!(handle.is_alive());
    }
}
