//! HTTP and WebSocket handlers.

pub mod channel;
pub mod health;
pub mod whisper;
pub mod ws;
