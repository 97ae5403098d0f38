//! JSON serialization for WebSocket messages.

use serde::Serialize;

use aangan_core::events::Whisper;

use super::types::{InboundMessage, OutboundMessage};

/// Borrowed form of [`OutboundMessage::Whisper`], serialized once per
/// delivery without cloning the shared whisper.
#[derive(Debug, Serialize)]
struct WhisperFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    channel: &'a str,
    whisper: &'a Whisper,
}

/// Serialize an outbound message
pub fn serialize_outbound(msg: &OutboundMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

/// Serialize a whisper delivery frame
pub fn serialize_whisper(channel: &str, whisper: &Whisper) -> Result<String, serde_json::Error> {
    serde_json::to_string(&WhisperFrame {
        kind: "whisper",
        channel,
        whisper,
    })
}

/// Deserialize an inbound message from JSON
pub fn deserialize_inbound(text: &str) -> Result<InboundMessage, serde_json::Error> {
    serde_json::from_str(text)
}
