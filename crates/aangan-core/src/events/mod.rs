//! Domain events emitted by the Aangan CRUD layer.
//!
//! The broadcast core only consumes one event: a whisper has been
//! persisted and should be fanned out to live clients.

pub mod whisper;

pub use whisper::{Whisper, WhisperId, is_valid_zone};
