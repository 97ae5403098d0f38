//! Per-connection sessions and their subscription bookkeeping.

pub mod manager;
pub mod state;

pub use manager::{ConnectionSessionManager, SessionLimits, SubscribeOutcome, SubscribeRejection};
pub use state::{Session, SessionId, SessionInfo, SessionState};
