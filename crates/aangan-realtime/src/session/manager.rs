//! Connection session manager: binds connection lifecycle to engine
//! subscriptions and guarantees cleanup on disconnect.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use aangan_core::config::RealtimeConfig;
use aangan_core::error::AppError;
use aangan_core::result::AppResult;

use crate::channel::subscription::DeliveryError;
use crate::engine::{PubSubEngine, SubscribeOptions};
use crate::metrics::RealtimeMetrics;

use super::state::{Session, SessionId, SessionInfo, SessionState};

/// Subscription limits enforced per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Channels one session may hold at once.
    pub max_subscriptions_per_session: usize,
    /// Subscribers one channel may hold at once.
    pub max_subscribers_per_channel: usize,
}

impl From<&RealtimeConfig> for SessionLimits {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            max_subscriptions_per_session: config.max_subscriptions_per_session,
            max_subscribers_per_channel: config.max_subscribers_per_channel,
        }
    }
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self::from(&RealtimeConfig::default())
    }
}

/// Why a subscribe request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeRejection {
    /// The session already holds the maximum number of channels.
    SessionLimit {
        /// Configured maximum
        max: usize,
    },
    /// The channel already has the maximum number of subscribers.
    ChannelFull {
        /// Configured maximum
        max: usize,
    },
}

impl fmt::Display for SubscribeRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionLimit { max } => write!(f, "Maximum subscriptions ({max}) reached"),
            Self::ChannelFull { max } => write!(f, "Channel is full ({max} subscribers)"),
        }
    }
}

/// Result of [`ConnectionSessionManager::on_subscribe_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// A new subscription was registered.
    Subscribed {
        /// History messages delivered before returning
        replayed: usize,
    },
    /// The session already holds this channel; nothing changed.
    AlreadySubscribed,
    /// A limit was hit; nothing changed.
    Rejected(SubscribeRejection),
}

/// Tracks one session per client connection.
///
/// Each session's state is behind its own mutex, held for the whole of a
/// subscribe, unsubscribe or disconnect. Deliver callbacks run under that
/// mutex during replay, so they must not call back into the manager for
/// the same session.
pub struct ConnectionSessionManager<M> {
    /// Engine the subscriptions live in
    engine: Arc<PubSubEngine<M>>,
    /// Live sessions
    sessions: DashMap<SessionId, Arc<Mutex<Session<M>>>>,
    /// Limits
    limits: SessionLimits,
    /// Metrics
    metrics: Arc<RealtimeMetrics>,
}

impl<M> fmt::Debug for ConnectionSessionManager<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSessionManager")
            .field("sessions", &self.sessions.len())
            .field("limits", &self.limits)
            .finish()
    }
}

impl<M: Send + Sync + 'static> ConnectionSessionManager<M> {
    /// Creates a manager over `engine`.
    pub fn new(engine: Arc<PubSubEngine<M>>, limits: SessionLimits) -> Self {
        let metrics = Arc::clone(engine.metrics());
        Self {
            engine,
            sessions: DashMap::new(),
            limits,
            metrics,
        }
    }

    /// Opens a session for a new connection.
    pub fn on_connect(&self, connection_id: Uuid) -> SessionId {
        let session = Session::new(connection_id);
        let session_id = session.id;
        self.sessions
            .insert(session_id, Arc::new(Mutex::new(session)));

        debug!(session_id = %session_id, conn_id = %connection_id, "Session opened");
        session_id
    }

    /// Subscribes the session to `channel`, delivering through `deliver`.
    ///
    /// Re-subscribing to a channel the session already holds is a no-op.
    /// Fails only for an unknown or closed session.
    pub fn on_subscribe_request<F>(
        &self,
        session_id: SessionId,
        channel: &str,
        deliver: F,
        replay: bool,
    ) -> AppResult<SubscribeOutcome>
    where
        F: Fn(&Arc<M>) -> Result<(), DeliveryError> + Send + Sync + 'static,
    {
        let session = self.session(session_id)?;
        let mut session = session.lock();
        if !session.is_connected() {
            return Err(AppError::invalid_session(session_id));
        }

        if session.is_subscribed(channel) {
            debug!(session_id = %session_id, channel = %channel, "Already subscribed");
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }

        let max = self.limits.max_subscriptions_per_session;
        if session.subscription_count() >= max {
            warn!(session_id = %session_id, channel = %channel, max, "Session subscription limit reached");
            return Ok(SubscribeOutcome::Rejected(SubscribeRejection::SessionLimit { max }));
        }

        let max = self.limits.max_subscribers_per_channel;
        if self.engine.subscriber_count(channel) >= max {
            warn!(session_id = %session_id, channel = %channel, max, "Channel subscriber limit reached");
            return Ok(SubscribeOutcome::Rejected(SubscribeRejection::ChannelFull { max }));
        }

        let subscription = self
            .engine
            .subscribe(channel, deliver, SubscribeOptions { replay });
        let replayed = subscription.replayed();
        session
            .subscriptions
            .insert(channel.to_string(), subscription);

        debug!(
            session_id = %session_id,
            channel = %channel,
            replayed,
            "Session subscribed"
        );
        Ok(SubscribeOutcome::Subscribed { replayed })
    }

    /// Drops the session's subscription on `channel`.
    ///
    /// Returns whether one existed. Fails only for an unknown or closed
    /// session.
    pub fn on_unsubscribe_request(&self, session_id: SessionId, channel: &str) -> AppResult<bool> {
        let session = self.session(session_id)?;
        let mut session = session.lock();
        if !session.is_connected() {
            return Err(AppError::invalid_session(session_id));
        }

        let removed = match session.subscriptions.remove(channel) {
            Some(subscription) => {
                subscription.unsubscribe();
                true
            }
            None => false,
        };

        debug!(session_id = %session_id, channel = %channel, removed, "Session unsubscribed");
        Ok(removed)
    }

    /// Tears the session down, removing every subscription it holds.
    ///
    /// Idempotent: an unknown or already-closed session is a no-op that
    /// returns 0. Otherwise returns the number of subscriptions removed.
    pub fn on_disconnect(&self, session_id: SessionId) -> usize {
        let Some((_, session)) = self.sessions.remove(&session_id) else {
            return 0;
        };

        let mut session = session.lock();
        session.state = SessionState::Disconnecting;

        let subscriptions = std::mem::take(&mut session.subscriptions);
        let total = subscriptions.len();
        let mut removed = 0;
        for (channel, subscription) in subscriptions {
            if subscription.unsubscribe() {
                removed += 1;
            } else {
                debug!(session_id = %session_id, channel = %channel, "Subscription already removed");
            }
        }

        session.state = SessionState::Closed;

        info!(
            session_id = %session_id,
            conn_id = %session.connection_id,
            subscriptions = total,
            "Session closed"
        );
        removed
    }

    /// Disconnects every live session. Returns how many were closed.
    pub fn disconnect_all(&self) -> usize {
        let ids: Vec<SessionId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        let count = ids.len();
        for id in ids {
            self.on_disconnect(id);
        }
        count
    }

    /// State of a live session; `None` once it has been disconnected.
    pub fn session_state(&self, session_id: SessionId) -> Option<SessionState> {
        self.sessions
            .get(&session_id)
            .map(|session| session.lock().state)
    }

    /// Snapshot of a live session.
    pub fn session_info(&self, session_id: SessionId) -> AppResult<SessionInfo> {
        Ok(self.session(session_id)?.lock().info())
    }

    /// Channels a live session is subscribed to, sorted.
    pub fn subscriptions(&self, session_id: SessionId) -> AppResult<Vec<String>> {
        Ok(self.session(session_id)?.lock().channels())
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Engine the sessions subscribe into.
    pub fn engine(&self) -> &Arc<PubSubEngine<M>> {
        &self.engine
    }

    /// Shared metrics.
    pub fn metrics(&self) -> &Arc<RealtimeMetrics> {
        &self.metrics
    }

    fn session(&self, session_id: SessionId) -> AppResult<Arc<Mutex<Session<M>>>> {
        self.sessions
            .get(&session_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| AppError::invalid_session(session_id))
    }
}
