//! Session state machine.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::Subscription;

/// Unique session identifier
pub type SessionId = Uuid;

/// Lifecycle of a session.
///
/// `Connected` → `Disconnecting` → `Closed`. There is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Accepting subscribe and unsubscribe requests
    Connected,
    /// Teardown in progress
    Disconnecting,
    /// Every subscription has been removed
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Disconnecting => write!(f, "disconnecting"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// One client connection's session.
pub struct Session<M> {
    /// Session ID
    pub id: SessionId,
    /// Transport connection this session belongs to
    pub connection_id: Uuid,
    /// Current state
    pub state: SessionState,
    /// When the session was opened
    pub connected_at: DateTime<Utc>,
    /// Active subscriptions by channel
    pub(crate) subscriptions: HashMap<String, Subscription<M>>,
}

impl<M> Session<M> {
    /// Opens a session in the `Connected` state.
    pub fn new(connection_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            connection_id,
            state: SessionState::Connected,
            connected_at: Utc::now(),
            subscriptions: HashMap::new(),
        }
    }

    /// Whether the session still accepts requests.
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Whether the session holds a subscription on `channel`.
    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.subscriptions.contains_key(channel)
    }

    /// Number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Subscribed channels, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.subscriptions.keys().cloned().collect();
        channels.sort();
        channels
    }

    /// Serializable snapshot.
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            connection_id: self.connection_id,
            state: self.state,
            connected_at: self.connected_at,
            channels: self.channels(),
        }
    }
}

impl<M> fmt::Debug for Session<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("connection_id", &self.connection_id)
            .field("state", &self.state)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

/// Snapshot of session info (serializable)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session ID
    pub id: SessionId,
    /// Connection ID
    pub connection_id: Uuid,
    /// State
    pub state: SessionState,
    /// Connected at
    pub connected_at: DateTime<Utc>,
    /// Subscribed channels
    pub channels: Vec<String>,
}
