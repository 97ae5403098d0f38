//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use aangan_core::config::RealtimeConfig;
use aangan_core::events::Whisper;

use crate::bridge::whisper::WhisperBridge;
use crate::connection::adapter::TransportAdapter;
use crate::connection::heartbeat::HeartbeatConfig;
use crate::engine::PubSubEngine;
use crate::eviction;
use crate::metrics::RealtimeMetrics;
use crate::session::{ConnectionSessionManager, SessionLimits};

/// Central real-time engine, constructed once at startup and shared by
/// reference with the HTTP layer.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Publish/subscribe core.
    pub pubsub: Arc<PubSubEngine<Whisper>>,
    /// Per-connection sessions.
    pub sessions: Arc<ConnectionSessionManager<Whisper>>,
    /// WebSocket transport adapter.
    pub transport: Arc<TransportAdapter>,
    /// Producer interface for created whispers.
    pub bridge: WhisperBridge,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    /// Configuration.
    config: RealtimeConfig,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("pubsub", &self.pubsub)
            .field("sessions", &self.sessions)
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(config: RealtimeConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let metrics = Arc::new(RealtimeMetrics::new());
        let pubsub = Arc::new(PubSubEngine::with_metrics(
            config.history_capacity,
            Arc::clone(&metrics),
        ));
        let sessions = Arc::new(ConnectionSessionManager::new(
            Arc::clone(&pubsub),
            SessionLimits::from(&config),
        ));
        let transport = Arc::new(TransportAdapter::new(Arc::clone(&sessions), config.clone()));
        let bridge = WhisperBridge::new(Arc::clone(&pubsub));

        info!(
            history_capacity = config.history_capacity,
            client_publish = config.allow_client_publish,
            "Real-time engine initialized"
        );

        Self {
            pubsub,
            sessions,
            transport,
            bridge,
            metrics,
            config,
            shutdown_tx,
        }
    }

    /// Starts the idle-channel sweeper if eviction is configured.
    pub fn start_background_tasks(&self) -> Option<JoinHandle<()>> {
        let max_idle = self.config.idle_eviction()?;
        Some(eviction::spawn_sweeper(
            Arc::clone(&self.pubsub),
            max_idle,
            self.config.sweep_interval(),
            self.shutdown_receiver(),
        ))
    }

    /// Heartbeat settings for new connections.
    pub fn heartbeat_config(&self) -> HeartbeatConfig {
        HeartbeatConfig::from(&self.config)
    }

    /// Configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signals background tasks to stop and disconnects every session.
    ///
    /// Returns the number of connections closed.
    pub fn shutdown(&self) -> usize {
        info!("Shutting down real-time engine");

        let _ = self.shutdown_tx.send(());
        let closed = self.transport.close_all();

        info!(connections = closed, "Real-time engine shut down");
        closed
    }
}
