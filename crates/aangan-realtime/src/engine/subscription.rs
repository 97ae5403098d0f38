//! Handle returned by [`PubSubEngine::subscribe`](super::PubSubEngine::subscribe).

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::dispatch::{SlotMap, release_if_unused};
use crate::channel::registry::SubscriptionRegistry;
use crate::channel::store::ChannelStore;
use crate::channel::subscription::{SubscriptionHandle, SubscriptionId};
use crate::metrics::RealtimeMetrics;

/// A live subscription. Call [`unsubscribe`](Self::unsubscribe) to cancel it.
///
/// Dropping the value does not unsubscribe.
#[must_use = "keep the Subscription so the callback can be unsubscribed later"]
pub struct Subscription<M> {
    handle: SubscriptionHandle,
    registry: Arc<SubscriptionRegistry<M>>,
    store: Arc<ChannelStore<M>>,
    slots: Arc<SlotMap<M>>,
    metrics: Arc<RealtimeMetrics>,
    replayed: usize,
}

impl<M> Subscription<M> {
    pub(crate) fn new(
        handle: SubscriptionHandle,
        registry: Arc<SubscriptionRegistry<M>>,
        store: Arc<ChannelStore<M>>,
        slots: Arc<SlotMap<M>>,
        metrics: Arc<RealtimeMetrics>,
        replayed: usize,
    ) -> Self {
        Self {
            handle,
            registry,
            store,
            slots,
            metrics,
            replayed,
        }
    }

    /// Removes the callback from its channel.
    ///
    /// Idempotent: returns `true` only for the call that actually removed it.
    /// Safe to call while a publish is fanning out on another thread; that
    /// publish either reaches the callback or it does not.
    ///
    /// The last unsubscribe on a channel that never retained history frees
    /// the channel's state.
    pub fn unsubscribe(&self) -> bool {
        let removed = self.registry.remove(&self.handle);
        if removed {
            self.metrics.subscription_removed();
            release_if_unused(&self.slots, &self.registry, &self.store, self.handle.channel());
            debug!(
                channel = %self.handle.channel(),
                subscription = %self.handle.id(),
                "Unsubscribed"
            );
        }
        removed
    }

    /// Whether the callback is still registered.
    pub fn is_active(&self) -> bool {
        self.registry.contains(&self.handle)
    }

    /// Channel this subscription listens on.
    pub fn channel(&self) -> &str {
        self.handle.channel()
    }

    /// Subscription ID.
    pub fn id(&self) -> SubscriptionId {
        self.handle.id()
    }

    /// History messages delivered before `subscribe` returned.
    pub fn replayed(&self) -> usize {
        self.replayed
    }
}

impl<M> fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.handle.channel())
            .field("id", &self.handle.id())
            .field("replayed", &self.replayed)
            .finish()
    }
}
