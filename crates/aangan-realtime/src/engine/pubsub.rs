//! The publish/subscribe engine.
//!
//! `publish` appends to the channel's history and then fans the message out
//! synchronously to every subscriber. `subscribe` registers a callback and,
//! when replay is on, delivers the retained history to it before returning.
//!
//! Both run under a per-channel dispatch gate, which gives three guarantees:
//!
//! - per-channel FIFO: every subscriber sees a channel's messages in the
//!   order they were appended to history;
//! - replay-then-live: a new subscriber's replay finishes before any message
//!   published after it subscribed reaches it, and no message is delivered
//!   to it twice;
//! - a publish that races an in-flight subscribe is either replayed or
//!   delivered live, never both.
//!
//! The gate is held while callbacks run. A callback may publish to, or
//! subscribe on, its own channel; the nested publish is queued and
//! delivered after the current fan-out. A callback that publishes to a
//! *different* channel blocks until that channel's gate is free, so two
//! threads fanning out on channels A and B whose callbacks publish to B and
//! A respectively will deadlock. Callbacks that need to re-publish across
//! channels should hand the work to a task instead.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info, trace};

use super::dispatch::{ChannelSlot, DispatchState, SlotMap};
use super::subscription::Subscription;
use crate::channel::registry::{FanOutReport, SubscriptionRegistry};
use crate::channel::store::ChannelStore;
use crate::channel::subscription::{Callback, DeliveryError, invoke_isolated};
use crate::metrics::RealtimeMetrics;

/// Options for [`PubSubEngine::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Deliver the channel's retained history before returning.
    pub replay: bool,
}

impl SubscribeOptions {
    /// Live messages only.
    pub fn live_only() -> Self {
        Self { replay: false }
    }
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self { replay: true }
    }
}

/// Outcome of one [`PubSubEngine::publish`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Callbacks that accepted the message (plus any queued nested publishes
    /// drained by this call).
    pub delivered: usize,
    /// Callbacks that failed; these were logged and skipped.
    pub failed: usize,
    /// The message was queued behind an in-flight fan-out on the same
    /// channel and will be delivered by that fan-out.
    pub queued: bool,
}

/// In-process publish/subscribe engine over named channels.
pub struct PubSubEngine<M> {
    /// Recent history per channel.
    store: Arc<ChannelStore<M>>,
    /// Live callbacks per channel.
    registry: Arc<SubscriptionRegistry<M>>,
    /// Dispatch gates per channel.
    slots: Arc<SlotMap<M>>,
    /// Shared counters.
    metrics: Arc<RealtimeMetrics>,
}

impl<M> std::fmt::Debug for PubSubEngine<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubEngine")
            .field("channels", &self.store.channel_count())
            .field("history_capacity", &self.store.capacity())
            .field("registry", &self.registry)
            .finish()
    }
}

impl<M: Send + Sync + 'static> PubSubEngine<M> {
    /// Creates an engine retaining `history_capacity` messages per channel.
    pub fn new(history_capacity: usize) -> Self {
        Self::with_metrics(history_capacity, Arc::new(RealtimeMetrics::new()))
    }

    /// Creates an engine that reports into shared metrics.
    pub fn with_metrics(history_capacity: usize, metrics: Arc<RealtimeMetrics>) -> Self {
        Self {
            store: Arc::new(ChannelStore::new(history_capacity)),
            registry: Arc::new(SubscriptionRegistry::new()),
            slots: Arc::new(DashMap::new()),
            metrics,
        }
    }

    /// Appends `message` to the channel's history and delivers it to every
    /// current subscriber before returning.
    ///
    /// Subscriber failures are isolated and counted in the report; they never
    /// surface here. Publishing to a channel with no subscribers only
    /// updates history.
    pub fn publish(&self, channel: &str, message: impl Into<Arc<M>>) -> PublishReport {
        let message = message.into();
        let slot = self.slot(channel);
        let gate = slot.gate.lock();

        self.store.append(channel, Arc::clone(&message));
        self.metrics.message_published();

        let already_dispatching = {
            let mut state = gate.borrow_mut();
            state.pending.push_back(message);
            state.dispatching
        };

        if already_dispatching {
            trace!(channel = %channel, "Publish queued behind in-flight fan-out");
            return PublishReport {
                queued: true,
                ..PublishReport::default()
            };
        }

        let report = self.drain(channel, &gate);
        PublishReport {
            delivered: report.delivered,
            failed: report.failed,
            queued: false,
        }
    }

    /// Registers `callback` on `channel`.
    ///
    /// With `options.replay`, the channel's history is delivered to the
    /// callback oldest-first before this returns. Subscribing to a channel
    /// that has never been published to is valid and replays nothing.
    pub fn subscribe<F>(
        &self,
        channel: &str,
        callback: F,
        options: SubscribeOptions,
    ) -> Subscription<M>
    where
        F: Fn(&Arc<M>) -> Result<(), DeliveryError> + Send + Sync + 'static,
    {
        let callback: Callback<M> = Arc::new(callback);
        let slot = self.slot(channel);
        let gate = slot.gate.lock();

        let handle = self.registry.add(channel, Arc::clone(&callback));
        self.metrics.subscription_added();

        let mut replayed = 0;
        if options.replay {
            let (in_flight, was_dispatching) = {
                let state = gate.borrow();
                (state.pending.len(), state.dispatching)
            };

            // Messages still pending will reach this callback live.
            let history = self.store.history(channel);
            let settled = history.len().saturating_sub(in_flight);

            gate.borrow_mut().dispatching = true;
            for message in &history[..settled] {
                if !self.registry.contains(&handle) {
                    break;
                }
                match invoke_isolated(channel, handle.id(), &callback, message) {
                    Ok(()) => {
                        self.metrics.message_replayed();
                        replayed += 1;
                    }
                    Err(_) => self.metrics.subscriber_failure(),
                }
            }

            // Publishes made by replayed callbacks were queued; deliver them
            // unless an outer fan-out on this thread will.
            if !was_dispatching {
                self.drain(channel, &gate);
            }
        }

        debug!(
            channel = %channel,
            subscription = %handle.id(),
            replayed = replayed,
            "Subscribed"
        );

        Subscription::new(
            handle,
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            Arc::clone(&self.slots),
            Arc::clone(&self.metrics),
            replayed,
        )
    }

    /// Copy of a channel's history, oldest first.
    pub fn history(&self, channel: &str) -> Vec<Arc<M>> {
        self.store.history(channel)
    }

    /// Number of live subscribers on a channel.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.registry.subscriber_count(channel)
    }

    /// Total live subscriptions.
    pub fn total_subscriptions(&self) -> usize {
        self.registry.total_subscriptions()
    }

    /// Number of channels with retained history.
    pub fn channel_count(&self) -> usize {
        self.store.channel_count()
    }

    /// Messages retained per channel.
    pub fn history_capacity(&self) -> usize {
        self.store.capacity()
    }

    /// Shared metrics.
    pub fn metrics(&self) -> &Arc<RealtimeMetrics> {
        &self.metrics
    }

    /// Evicts every channel with zero subscribers whose last publish is at
    /// least `max_idle` ago. Returns the evicted channel names.
    ///
    /// A channel in use by an in-flight publish or subscribe is skipped.
    pub fn evict_idle(&self, max_idle: Duration) -> Vec<String> {
        let now = Instant::now();
        let candidates: Vec<String> = self.slots.iter().map(|entry| entry.key().clone()).collect();

        let mut evicted = Vec::new();
        for channel in candidates {
            let removed = self.slots.remove_if(&channel, |name, slot| {
                if Arc::strong_count(slot) > 1 || self.registry.subscriber_count(name) > 0 {
                    return false;
                }
                let last_active = self.store.last_publish(name).unwrap_or(slot.created_at);
                if now.saturating_duration_since(last_active) < max_idle {
                    return false;
                }
                self.store.evict_channel(name);
                true
            });

            if removed.is_some() {
                evicted.push(channel);
            }
        }

        if !evicted.is_empty() {
            self.metrics.channels_evicted(evicted.len());
            info!(count = evicted.len(), channels = ?evicted, "Evicted idle channels");
        }

        evicted
    }

    /// Dispatch gate for a channel, created on first use.
    fn slot(&self, channel: &str) -> Arc<ChannelSlot<M>> {
        if let Some(slot) = self.slots.get(channel) {
            return Arc::clone(slot.value());
        }
        Arc::clone(
            self.slots
                .entry(channel.to_string())
                .or_insert_with(|| Arc::new(ChannelSlot::new()))
                .value(),
        )
    }

    /// Fans out pending messages until the queue is empty.
    ///
    /// Callers must hold the channel's gate.
    fn drain(&self, channel: &str, gate: &RefCell<DispatchState<M>>) -> FanOutReport {
        gate.borrow_mut().dispatching = true;

        let mut total = FanOutReport::default();
        loop {
            let next = gate.borrow_mut().pending.pop_front();
            let Some(message) = next else {
                break;
            };
            let report = self.registry.fan_out(channel, &message);
            self.metrics.fan_out(report.delivered, report.failed);
            total += report;
        }

        gate.borrow_mut().dispatching = false;
        total
    }
}
