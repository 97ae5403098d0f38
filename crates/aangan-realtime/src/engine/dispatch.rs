//! Per-channel dispatch gate.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::ReentrantMutex;

use crate::channel::registry::SubscriptionRegistry;
use crate::channel::store::ChannelStore;

/// Dispatch gates keyed by channel name.
pub(crate) type SlotMap<M> = DashMap<String, Arc<ChannelSlot<M>>>;

/// Serializes publish and subscribe-with-replay on one channel.
///
/// The gate is reentrant so a subscriber callback running on the dispatching
/// thread can publish or subscribe to the same channel; such nested
/// publishes are queued in `pending` and drained by the outer fan-out loop,
/// which keeps per-channel delivery in publish order.
pub(crate) struct ChannelSlot<M> {
    pub(crate) gate: ReentrantMutex<RefCell<DispatchState<M>>>,
    pub(crate) created_at: Instant,
}

pub(crate) struct DispatchState<M> {
    /// A fan-out loop is running on the thread that holds the gate.
    pub(crate) dispatching: bool,
    /// Published messages not yet fanned out.
    pub(crate) pending: VecDeque<Arc<M>>,
}

impl<M> ChannelSlot<M> {
    pub(crate) fn new() -> Self {
        Self {
            gate: ReentrantMutex::new(RefCell::new(DispatchState {
                dispatching: false,
                pending: VecDeque::new(),
            })),
            created_at: Instant::now(),
        }
    }
}

/// Removes the channel's slot once nothing refers to the channel any more:
/// no in-flight dispatch holds the slot, no subscribers remain, and no
/// history is retained. Returns whether the slot was removed.
pub(crate) fn release_if_unused<M>(
    slots: &SlotMap<M>,
    registry: &SubscriptionRegistry<M>,
    store: &ChannelStore<M>,
    channel: &str,
) -> bool {
    slots
        .remove_if(channel, |name, slot| {
            Arc::strong_count(slot) == 1
                && registry.subscriber_count(name) == 0
                && store.history_len(name) == 0
        })
        .is_some()
}
