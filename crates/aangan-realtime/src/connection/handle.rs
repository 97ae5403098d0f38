//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use uuid::Uuid;

use crate::channel::subscription::DeliveryError;
use crate::message::serializer::serialize_outbound;
use crate::message::types::OutboundMessage;
use crate::session::SessionId;

/// Unique connection identifier
pub type ConnectionId = Uuid;

/// A handle to a single WebSocket connection.
///
/// Holds the bounded queue feeding the socket writer. Sends never block:
/// a full queue drops the frame, a closed queue marks the connection dead.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Session this connection owns
    pub session_id: SessionId,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Sender for serialized outbound frames
    sender: mpsc::Sender<String>,
    /// Last inbound traffic
    last_activity: Mutex<Instant>,
    /// Whether the connection is still alive
    alive: AtomicBool,
    /// Flips to `true` once, when the connection dies
    closed_tx: watch::Sender<bool>,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(id: ConnectionId, session_id: SessionId, sender: mpsc::Sender<String>) -> Self {
        let (closed_tx, _) = watch::channel(false);
        Self {
            id,
            session_id,
            connected_at: Utc::now(),
            sender,
            last_activity: Mutex::new(Instant::now()),
            alive: AtomicBool::new(true),
            closed_tx,
        }
    }

    /// Queue a serialized frame for this connection
    pub fn send(&self, frame: String) -> Result<(), DeliveryError> {
        if !self.is_alive() {
            return Err(DeliveryError::Closed);
        }
        match self.sender.try_send(frame) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Send buffer full, dropping message");
                Err(DeliveryError::Backpressure)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                Err(DeliveryError::Closed)
            }
        }
    }

    /// Serialize and queue an outbound message
    pub fn send_message(&self, msg: &OutboundMessage) -> Result<(), DeliveryError> {
        let frame = serialize_outbound(msg).map_err(|e| {
            tracing::error!(conn_id = %self.id, error = %e, "Failed to serialize outbound message");
            DeliveryError::Encoding(e.to_string())
        })?;
        self.send(frame)
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead and wake anything waiting in [`closed`](Self::closed)
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.closed_tx.send_replace(true);
    }

    /// Resolves once the connection has been marked dead
    pub async fn closed(&self) {
        let mut rx = self.closed_tx.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Record inbound traffic
    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Time since the last inbound traffic
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Get a snapshot of connection info
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            session_id: self.session_id,
            connected_at: self.connected_at,
            idle_seconds: self.idle_for().as_secs(),
            alive: self.is_alive(),
        }
    }
}

/// Snapshot of connection info (serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// Session ID
    pub session_id: SessionId,
    /// Connected at
    pub connected_at: DateTime<Utc>,
    /// Seconds since last inbound traffic
    pub idle_seconds: u64,
    /// Is alive
    pub alive: bool,
}
