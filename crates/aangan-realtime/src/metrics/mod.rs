//! Realtime engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    /// Total connections established
    connections_opened: AtomicU64,
    /// Connections currently open
    connections_active: AtomicU64,
    /// Total subscribe operations
    subscriptions_total: AtomicU64,
    /// Subscriptions currently registered
    subscriptions_active: AtomicU64,
    /// Messages published
    messages_published: AtomicU64,
    /// Live deliveries accepted by subscribers
    messages_delivered: AtomicU64,
    /// History messages replayed to new subscribers
    messages_replayed: AtomicU64,
    /// Deliveries a subscriber rejected or panicked on
    subscriber_failures: AtomicU64,
    /// Frames dropped because a connection's queue was full
    outbound_dropped: AtomicU64,
    /// Channels removed by idle eviction
    channels_evicted: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection
    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a closed connection
    pub fn connection_closed(&self) {
        decrement(&self.connections_active);
    }

    /// Record a subscribe
    pub fn subscription_added(&self) {
        self.subscriptions_total.fetch_add(1, Ordering::Relaxed);
        self.subscriptions_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an unsubscribe
    pub fn subscription_removed(&self) {
        decrement(&self.subscriptions_active);
    }

    /// Record a publish
    pub fn message_published(&self) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Record live deliveries and failures from one fan-out
    pub fn fan_out(&self, delivered: usize, failed: usize) {
        self.messages_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.subscriber_failures
            .fetch_add(failed as u64, Ordering::Relaxed);
    }

    /// Record a replayed history message
    pub fn message_replayed(&self) {
        self.messages_replayed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed delivery outside of fan-out (e.g. during replay)
    pub fn subscriber_failure(&self) {
        self.subscriber_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame dropped on a full queue
    pub fn outbound_dropped(&self) {
        self.outbound_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record evicted channels
    pub fn channels_evicted(&self, count: usize) {
        self.channels_evicted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            subscriptions_total: self.subscriptions_total.load(Ordering::Relaxed),
            subscriptions_active: self.subscriptions_active.load(Ordering::Relaxed),
            messages_published: self.messages_published.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            messages_replayed: self.messages_replayed.load(Ordering::Relaxed),
            subscriber_failures: self.subscriber_failures.load(Ordering::Relaxed),
            outbound_dropped: self.outbound_dropped.load(Ordering::Relaxed),
            channels_evicted: self.channels_evicted.load(Ordering::Relaxed),
        }
    }
}

/// Saturating decrement for gauges.
fn decrement(counter: &AtomicU64) {
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
        Some(v.saturating_sub(1))
    });
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total connections ever established
    pub connections_opened: u64,
    /// Currently open connections
    pub connections_active: u64,
    /// Total subscribe operations
    pub subscriptions_total: u64,
    /// Currently registered subscriptions
    pub subscriptions_active: u64,
    /// Messages published
    pub messages_published: u64,
    /// Live deliveries
    pub messages_delivered: u64,
    /// Replayed history messages
    pub messages_replayed: u64,
    /// Failed deliveries
    pub subscriber_failures: u64,
    /// Frames dropped on full queues
    pub outbound_dropped: u64,
    /// Channels evicted as idle
    pub channels_evicted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauges_do_not_underflow() {
        let metrics = RealtimeMetrics::new();
        metrics.connection_closed();
        metrics.subscription_removed();
        let snap = metrics.snapshot();
        assert_eq!(snap.connections_active, 0);
        assert_eq!(snap.subscriptions_active, 0);
    }

    #[test]
    fn test_fan_out_counts() {
        let metrics = RealtimeMetrics::new();
        metrics.fan_out(3, 1);
        metrics.subscriber_failure();
        let snap = metrics.snapshot();
        assert_eq!(snap.messages_delivered, 3);
        assert_eq!(snap.subscriber_failures, 2);
    }
}
