//! Bridges between the persistence layer and the broadcast core.

pub mod whisper;

pub use whisper::WhisperBridge;
