//! Transport adapter: translates socket frames into session and engine
//! calls, and engine deliveries into frames on a specific connection.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use aangan_core::config::RealtimeConfig;
use aangan_core::error::AppError;
use aangan_core::events::Whisper;

use crate::channel::subscription::DeliveryError;
use crate::engine::PubSubEngine;
use crate::message::serializer::{deserialize_inbound, serialize_whisper};
use crate::message::types::{ErrorCode, InboundMessage, OutboundMessage};
use crate::message::validator::{validate_channel_name, validate_inbound};
use crate::metrics::RealtimeMetrics;
use crate::session::{ConnectionSessionManager, SubscribeOutcome, SubscribeRejection};

use super::handle::{ConnectionHandle, ConnectionId};

/// What the socket loop should do after an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundAction {
    /// Keep reading.
    Continue,
    /// Close the connection.
    Close,
}

/// The only component that knows about connections.
#[derive(Debug)]
pub struct TransportAdapter {
    /// Session bookkeeping
    sessions: Arc<ConnectionSessionManager<Whisper>>,
    /// Live connections
    connections: DashMap<ConnectionId, Arc<ConnectionHandle>>,
    /// Configuration
    config: RealtimeConfig,
    /// Metrics
    metrics: Arc<RealtimeMetrics>,
}

impl TransportAdapter {
    /// Creates an adapter over a session manager.
    pub fn new(sessions: Arc<ConnectionSessionManager<Whisper>>, config: RealtimeConfig) -> Self {
        let metrics = Arc::clone(sessions.metrics());
        Self {
            sessions,
            connections: DashMap::new(),
            config,
            metrics,
        }
    }

    /// Registers a new connection and opens its session.
    ///
    /// Returns the handle and the receiver the socket writer drains. A
    /// `welcome` frame is already queued.
    pub fn open(&self) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.config.outbound_buffer_size.max(1));

        let conn_id = Uuid::new_v4();
        let session_id = self.sessions.on_connect(conn_id);
        let handle = Arc::new(ConnectionHandle::new(conn_id, session_id, tx));

        self.connections.insert(conn_id, Arc::clone(&handle));
        self.metrics.connection_opened();

        self.reply(&handle, &OutboundMessage::Welcome { session_id });

        info!(conn_id = %conn_id, session_id = %session_id, "WebSocket connection opened");
        (handle, rx)
    }

    /// Processes one inbound text frame.
    pub fn handle_inbound(&self, conn_id: &ConnectionId, raw: &str) -> InboundAction {
        let Some(handle) = self.connection(conn_id) else {
            warn!(conn_id = %conn_id, "Message from unknown connection");
            return InboundAction::Close;
        };

        handle.touch();

        if let Err(e) = validate_inbound(raw) {
            self.reply_error(&handle, ErrorCode::InvalidMessage, e.message);
            return InboundAction::Continue;
        }

        let msg = match deserialize_inbound(raw) {
            Ok(m) => m,
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "Unparseable client message");
                self.reply_error(
                    &handle,
                    ErrorCode::InvalidMessage,
                    format!("Failed to parse message: {e}"),
                );
                return InboundAction::Continue;
            }
        };

        match msg {
            InboundMessage::Subscribe { channel, replay } => {
                let replay = replay.unwrap_or(self.config.replay_on_subscribe);
                self.handle_subscribe(&handle, &channel, replay)
            }
            InboundMessage::Unsubscribe { channel } => self.handle_unsubscribe(&handle, &channel),
            InboundMessage::Publish { channel, whisper } => {
                self.handle_publish(&handle, &channel, whisper);
                InboundAction::Continue
            }
            InboundMessage::Pong { .. } => InboundAction::Continue,
        }
    }

    /// Closes a connection and tears its session down. Idempotent.
    pub fn close(&self, conn_id: &ConnectionId) -> bool {
        let Some((_, handle)) = self.connections.remove(conn_id) else {
            return false;
        };

        handle.mark_dead();
        let removed = self.sessions.on_disconnect(handle.session_id);
        self.metrics.connection_closed();

        info!(
            conn_id = %conn_id,
            session_id = %handle.session_id,
            subscriptions = removed,
            "WebSocket connection closed"
        );
        true
    }

    /// Closes every connection. Returns how many were closed.
    pub fn close_all(&self) -> usize {
        let ids: Vec<ConnectionId> = self.connections.iter().map(|entry| *entry.key()).collect();
        ids.iter().filter(|id| self.close(id)).count()
    }

    /// Looks up a live connection.
    pub fn connection(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.connections
            .get(conn_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Session manager behind this adapter.
    pub fn sessions(&self) -> &Arc<ConnectionSessionManager<Whisper>> {
        &self.sessions
    }

    /// Engine behind this adapter.
    pub fn engine(&self) -> &Arc<PubSubEngine<Whisper>> {
        self.sessions.engine()
    }

    /// Configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    fn handle_subscribe(&self, handle: &Arc<ConnectionHandle>, raw: &str, replay: bool) -> InboundAction {
        let channel = match validate_channel_name(raw) {
            Ok(c) => c,
            Err(e) => {
                self.reply_error(handle, ErrorCode::InvalidChannel, e.message);
                return InboundAction::Continue;
            }
        };

        let deliver = self.deliver_to(handle, &channel);
        match self
            .sessions
            .on_subscribe_request(handle.session_id, &channel, deliver, replay)
        {
            Ok(SubscribeOutcome::Subscribed { replayed }) => {
                self.reply(handle, &OutboundMessage::Subscribed { channel, replayed });
            }
            Ok(SubscribeOutcome::AlreadySubscribed) => {
                self.reply(handle, &OutboundMessage::Subscribed { channel, replayed: 0 });
            }
            Ok(SubscribeOutcome::Rejected(rejection)) => {
                let code = match rejection {
                    SubscribeRejection::SessionLimit { .. } => ErrorCode::MaxSubscriptions,
                    SubscribeRejection::ChannelFull { .. } => ErrorCode::ChannelFull,
                };
                self.reply_error(handle, code, rejection.to_string());
            }
            Err(e) => return self.protocol_violation(handle, e),
        }
        InboundAction::Continue
    }

    fn handle_unsubscribe(&self, handle: &Arc<ConnectionHandle>, raw: &str) -> InboundAction {
        let channel = match validate_channel_name(raw) {
            Ok(c) => c,
            Err(e) => {
                self.reply_error(handle, ErrorCode::InvalidChannel, e.message);
                return InboundAction::Continue;
            }
        };

        match self.sessions.on_unsubscribe_request(handle.session_id, &channel) {
            Ok(_) => {
                self.reply(handle, &OutboundMessage::Unsubscribed { channel });
                InboundAction::Continue
            }
            Err(e) => self.protocol_violation(handle, e),
        }
    }

    fn handle_publish(&self, handle: &Arc<ConnectionHandle>, raw: &str, whisper: Whisper) {
        if !self.config.allow_client_publish {
            self.reply_error(
                handle,
                ErrorCode::Forbidden,
                "Clients may not publish; post whispers through the API",
            );
            return;
        }

        let channel = match validate_channel_name(raw) {
            Ok(c) => c,
            Err(e) => {
                self.reply_error(handle, ErrorCode::InvalidChannel, e.message);
                return;
            }
        };

        match whisper.validated() {
            Ok(whisper) => {
                let report = self.engine().publish(&channel, whisper);
                debug!(
                    conn_id = %handle.id,
                    channel = %channel,
                    delivered = report.delivered,
                    "Client publish"
                );
            }
            Err(e) => self.reply_error(handle, ErrorCode::InvalidMessage, e.message),
        }
    }

    /// Deliver callback that pushes whispers down one connection.
    fn deliver_to(
        &self,
        handle: &Arc<ConnectionHandle>,
        channel: &str,
    ) -> impl Fn(&Arc<Whisper>) -> Result<(), DeliveryError> + Send + Sync + 'static {
        let handle = Arc::clone(handle);
        let channel = channel.to_string();
        let metrics = Arc::clone(&self.metrics);

        move |whisper: &Arc<Whisper>| {
            let frame = serialize_whisper(&channel, whisper).map_err(|e| {
                error!(conn_id = %handle.id, channel = %channel, error = %e, "Failed to serialize whisper");
                DeliveryError::Encoding(e.to_string())
            })?;
            handle.send(frame).inspect_err(|e| {
                if *e == DeliveryError::Backpressure {
                    metrics.outbound_dropped();
                }
            })
        }
    }

    fn protocol_violation(&self, handle: &ConnectionHandle, err: AppError) -> InboundAction {
        warn!(conn_id = %handle.id, session_id = %handle.session_id, error = %err, "Protocol violation");
        let code = if err.is_invalid_session() {
            ErrorCode::InvalidSession
        } else {
            ErrorCode::InvalidMessage
        };
        self.reply_error(handle, code, err.message);
        InboundAction::Close
    }

    fn reply(&self, handle: &ConnectionHandle, msg: &OutboundMessage) {
        if let Err(e) = handle.send_message(msg) {
            debug!(conn_id = %handle.id, error = %e, "Reply not delivered");
        }
    }

    fn reply_error(&self, handle: &ConnectionHandle, code: ErrorCode, message: impl Into<String>) {
        self.reply(handle, &OutboundMessage::error(code, message));
    }
}
