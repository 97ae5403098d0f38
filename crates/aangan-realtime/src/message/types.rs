//! Inbound and outbound WebSocket message type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aangan_core::events::Whisper;

/// Messages sent by the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Subscribe to a channel.
    Subscribe {
        /// Channel name.
        channel: String,
        /// Replay history first; falls back to the server default.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        replay: Option<bool>,
    },
    /// Unsubscribe from a channel.
    Unsubscribe {
        /// Channel name.
        channel: String,
    },
    /// Publish a whisper directly (only when enabled server-side).
    Publish {
        /// Channel name.
        channel: String,
        /// Whisper payload.
        whisper: Whisper,
    },
    /// Pong response to server ping.
    Pong {
        /// Echoed timestamp.
        timestamp: i64,
    },
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// First frame on every connection.
    Welcome {
        /// Session assigned to this connection.
        session_id: Uuid,
    },
    /// Subscription confirmed. Sent after any replayed whispers.
    Subscribed {
        /// Channel name.
        channel: String,
        /// Whispers replayed from history.
        replayed: usize,
    },
    /// Unsubscription confirmed.
    Unsubscribed {
        /// Channel name.
        channel: String,
    },
    /// Whisper delivery.
    Whisper {
        /// Channel it was published to.
        channel: String,
        /// Payload.
        whisper: Whisper,
    },
    /// Ping (server keepalive).
    Ping {
        /// Server timestamp.
        timestamp: i64,
    },
    /// Error message.
    Error {
        /// Error code.
        code: ErrorCode,
        /// Error description.
        message: String,
    },
}

impl OutboundMessage {
    /// Builds an error frame.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}

/// Protocol error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Frame empty, oversized, or not a known message.
    InvalidMessage,
    /// Channel name is not a zone or the global feed.
    InvalidChannel,
    /// Session subscription limit reached.
    MaxSubscriptions,
    /// Channel subscriber limit reached.
    ChannelFull,
    /// Operation not permitted for clients.
    Forbidden,
    /// Session unknown or closed; the connection will be closed.
    InvalidSession,
}

impl ErrorCode {
    /// Code as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidMessage => "INVALID_MESSAGE",
            Self::InvalidChannel => "INVALID_CHANNEL",
            Self::MaxSubscriptions => "MAX_SUBSCRIPTIONS",
            Self::ChannelFull => "CHANNEL_FULL",
            Self::Forbidden => "FORBIDDEN",
            Self::InvalidSession => "INVALID_SESSION",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_replay_is_optional() {
        let msg: InboundMessage =
            serde_json::from_str(r#"{"type":"subscribe","channel":"tapri"}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::Subscribe {
                channel: "tapri".to_string(),
                replay: None
            }
        );

        let msg: InboundMessage =
            serde_json::from_str(r#"{"type":"subscribe","channel":"tapri","replay":false}"#)
                .unwrap();
        assert!(matches!(msg, InboundMessage::Subscribe { replay: Some(false), .. }));
    }

    #[test]
    fn test_error_code_wire_form() {
        let frame = OutboundMessage::error(ErrorCode::MaxSubscriptions, "limit");
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], ErrorCode::MaxSubscriptions.as_str());
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(serde_json::from_str::<InboundMessage>(r#"{"type":"presence_update"}"#).is_err());
    }
}
