//! # aangan-realtime
//!
//! In-process whisper broadcast core for Aangan. Provides:
//!
//! - Channel history with bounded replay for late subscribers
//! - A publish/subscribe engine with per-channel FIFO fan-out and
//!   failure isolation between subscribers
//! - Per-connection sessions with guaranteed cleanup on disconnect
//! - The WebSocket transport adapter, heartbeat, and wire protocol
//! - Idle-channel eviction

pub mod bridge;
pub mod channel;
pub mod connection;
pub mod engine;
pub mod eviction;
pub mod message;
pub mod metrics;
pub mod server;
pub mod session;

pub use bridge::WhisperBridge;
pub use channel::{DeliveryError, GLOBAL_FEED_CHANNEL};
pub use connection::{ConnectionHandle, TransportAdapter};
pub use engine::{PubSubEngine, SubscribeOptions, Subscription};
pub use server::RealtimeEngine;
pub use session::ConnectionSessionManager;
