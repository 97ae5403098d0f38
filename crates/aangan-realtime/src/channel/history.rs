//! Bounded per-channel message history.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

/// Ring buffer of the most recent messages on one channel.
///
/// Holds at most `capacity` messages in publish order; the oldest is
/// evicted on overflow.
#[derive(Debug)]
pub struct HistoryBuffer<M> {
    /// Messages, oldest first.
    messages: VecDeque<Arc<M>>,
    /// Maximum retained messages.
    capacity: usize,
    /// When the last message was appended.
    last_publish: Instant,
}

impl<M> HistoryBuffer<M> {
    /// Creates an empty buffer.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
            last_publish: Instant::now(),
        }
    }

    /// Appends a message, evicting from the head if over capacity.
    pub fn push(&mut self, message: Arc<M>) {
        self.messages.push_back(message);
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
        self.last_publish = Instant::now();
    }

    /// Copies the buffer, oldest first.
    pub fn snapshot(&self) -> Vec<Arc<M>> {
        self.messages.iter().cloned().collect()
    }

    /// Number of retained messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the buffer holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// When the last message was appended.
    pub fn last_publish(&self) -> Instant {
        self.last_publish
    }
}
