//! Subscription registry: the live callbacks for every channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::subscription::{Callback, SubscriptionHandle, SubscriptionId, invoke_isolated};

/// One registered callback.
struct Subscriber<M> {
    id: SubscriptionId,
    callback: Callback<M>,
}

/// Outcome of delivering one message to a channel's subscribers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Callbacks that accepted the message.
    pub delivered: usize,
    /// Callbacks that returned an error or panicked.
    pub failed: usize,
}

impl std::ops::AddAssign for FanOutReport {
    fn add_assign(&mut self, rhs: Self) {
        self.delivered += rhs.delivered;
        self.failed += rhs.failed;
    }
}

/// Registry of subscriber callbacks per channel.
///
/// Registration order is preserved per channel. Duplicate registrations are
/// tracked independently.
pub struct SubscriptionRegistry<M> {
    /// Channel name → subscribers in registration order.
    channels: DashMap<String, Vec<Subscriber<M>>>,
    /// Subscription ID → channel name (reverse index).
    index: DashMap<SubscriptionId, String>,
    /// Next subscription ID.
    next_id: AtomicU64,
}

impl<M> std::fmt::Debug for SubscriptionRegistry<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("channels", &self.channels.len())
            .field("subscriptions", &self.index.len())
            .finish()
    }
}

impl<M> SubscriptionRegistry<M> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            index: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a callback on a channel.
    pub fn add(&self, channel: &str, callback: Callback<M>) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        self.channels
            .entry(channel.to_string())
            .or_default()
            .push(Subscriber { id, callback });
        self.index.insert(id, channel.to_string());

        SubscriptionHandle {
            id,
            channel: channel.to_string(),
        }
    }

    /// Removes exactly the entry behind `handle`.
    ///
    /// Returns `false` if it was already removed.
    pub fn remove(&self, handle: &SubscriptionHandle) -> bool {
        if self.index.remove(&handle.id).is_none() {
            return false;
        }

        if let Some(mut subscribers) = self.channels.get_mut(&handle.channel) {
            subscribers.retain(|s| s.id != handle.id);
            if subscribers.is_empty() {
                drop(subscribers);
                self.channels
                    .remove_if(&handle.channel, |_, subscribers| subscribers.is_empty());
            }
        }

        true
    }

    /// Whether the handle is still registered.
    pub fn contains(&self, handle: &SubscriptionHandle) -> bool {
        self.index.contains_key(&handle.id)
    }

    /// Copies the channel's callbacks in registration order.
    ///
    /// The copy is taken under the shard lock and the lock is released
    /// before returning, so callers can invoke callbacks freely.
    pub fn snapshot(&self, channel: &str) -> Vec<(SubscriptionId, Callback<M>)> {
        self.channels
            .get(channel)
            .map(|subscribers| {
                subscribers
                    .iter()
                    .map(|s| (s.id, Arc::clone(&s.callback)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Invokes `visit` for every callback currently on the channel.
    ///
    /// Iterates a snapshot, so callbacks may subscribe, unsubscribe, or
    /// publish without disturbing this pass.
    pub fn for_each<F>(&self, channel: &str, mut visit: F)
    where
        F: FnMut(SubscriptionId, &Callback<M>),
    {
        for (id, callback) in self.snapshot(channel) {
            visit(id, &callback);
        }
    }

    /// Delivers `message` to every subscriber on the channel.
    ///
    /// A failing or panicking callback is logged and skipped; the remaining
    /// callbacks still run.
    pub fn fan_out(&self, channel: &str, message: &Arc<M>) -> FanOutReport {
        let mut report = FanOutReport::default();
        self.for_each(channel, |id, callback| {
            match invoke_isolated(channel, id, callback, message) {
                Ok(()) => report.delivered += 1,
                Err(_) => report.failed += 1,
            }
        });
        report
    }

    /// Number of subscribers on a channel.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    /// Total subscriptions across all channels.
    pub fn total_subscriptions(&self) -> usize {
        self.index.len()
    }

    /// Number of channels with at least one subscriber.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl<M> Default for SubscriptionRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}
