//! Channel store holding recent history per channel for replay to late joiners.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::history::HistoryBuffer;

/// In-process map from channel name to its bounded history.
///
/// Entries are created lazily on first append and live until evicted.
#[derive(Debug)]
pub struct ChannelStore<M> {
    /// Channel name → history buffer.
    channels: DashMap<String, HistoryBuffer<M>>,
    /// Messages retained per channel.
    capacity: usize,
}

impl<M> ChannelStore<M> {
    /// Creates an empty store retaining `capacity` messages per channel.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Appends a message to the tail of a channel's history.
    pub fn append(&self, channel: &str, message: Arc<M>) {
        if let Some(mut buffer) = self.channels.get_mut(channel) {
            buffer.push(message);
            return;
        }

        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| HistoryBuffer::new(self.capacity))
            .push(message);
    }

    /// Returns a copy of a channel's history, oldest first.
    ///
    /// Unknown channels yield an empty list.
    pub fn history(&self, channel: &str) -> Vec<Arc<M>> {
        self.channels
            .get(channel)
            .map(|buffer| buffer.snapshot())
            .unwrap_or_default()
    }

    /// Number of messages retained for a channel.
    pub fn history_len(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|buffer| buffer.len())
            .unwrap_or(0)
    }

    /// When the channel last received a message.
    pub fn last_publish(&self, channel: &str) -> Option<Instant> {
        self.channels.get(channel).map(|buffer| buffer.last_publish())
    }

    /// Removes a channel's history. Returns whether it existed.
    pub fn evict_channel(&self, channel: &str) -> bool {
        self.channels.remove(channel).is_some()
    }

    /// Names of channels whose last publish is at least `max_idle` before `now`.
    pub fn idle_channels(&self, max_idle: Duration, now: Instant) -> Vec<String> {
        self.channels
            .iter()
            .filter(|entry| now.saturating_duration_since(entry.value().last_publish()) >= max_idle)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of channels with retained history.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Messages retained per channel.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
