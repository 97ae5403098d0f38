//! WebSocket wire messages, serialization, and validation.

pub mod serializer;
pub mod types;
pub mod validator;

pub use types::{ErrorCode, InboundMessage, OutboundMessage};
