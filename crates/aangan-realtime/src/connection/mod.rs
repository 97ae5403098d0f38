//! WebSocket connections: handles, heartbeat, and the transport adapter.

pub mod adapter;
pub mod handle;
pub mod heartbeat;

pub use adapter::{InboundAction, TransportAdapter};
pub use handle::{ConnectionHandle, ConnectionId};
