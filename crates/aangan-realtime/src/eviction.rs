//! Background sweeper applying the idle-channel eviction policy.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info};

use crate::engine::PubSubEngine;

/// Spawns a task that calls [`PubSubEngine::evict_idle`] every `interval`
/// until `shutdown` fires.
pub fn spawn_sweeper<M: Send + Sync + 'static>(
    engine: Arc<PubSubEngine<M>>,
    max_idle: Duration,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            max_idle_seconds = max_idle.as_secs(),
            interval_seconds = interval.as_secs(),
            "Channel eviction sweeper started"
        );

        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = engine.evict_idle(max_idle);
                    debug!(evicted = evicted.len(), remaining = engine.channel_count(), "Eviction sweep");
                }
                _ = shutdown.recv() => break,
            }
        }

        info!("Channel eviction sweeper stopped");
    })
}
