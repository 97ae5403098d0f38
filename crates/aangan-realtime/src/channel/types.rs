//! Channel naming: campus zones and the reserved global feed.

use serde::{Deserialize, Serialize};

use aangan_core::error::AppError;
use aangan_core::events::is_valid_zone;

/// Reserved channel carrying every whisper regardless of zone.
///
/// Zone names may not start with `__`, so this can never collide with a zone.
pub const GLOBAL_FEED_CHANNEL: &str = "__feed__";

/// Typed channel identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "zone", rename_all = "snake_case")]
pub enum ChannelType {
    /// Whispers posted in one campus zone.
    Zone(String),
    /// The unfiltered feed.
    GlobalFeed,
}

impl ChannelType {
    /// Parses a channel string into a typed channel.
    ///
    /// Zone names are case-folded; anything that is neither the feed nor a
    /// legal zone is rejected.
    pub fn parse(channel: &str) -> Result<Self, AppError> {
        let channel = channel.trim();
        if channel == GLOBAL_FEED_CHANNEL {
            return Ok(ChannelType::GlobalFeed);
        }

        let zone = channel.to_ascii_lowercase();
        if is_valid_zone(&zone) {
            Ok(ChannelType::Zone(zone))
        } else {
            Err(AppError::validation(format!("Invalid channel name: {channel}")))
        }
    }

    /// Converts back to a channel string.
    pub fn to_channel_string(&self) -> String {
        match self {
            ChannelType::Zone(zone) => zone.clone(),
            ChannelType::GlobalFeed => GLOBAL_FEED_CHANNEL.to_string(),
        }
    }

    /// Whether this is the global feed.
    pub fn is_global_feed(&self) -> bool {
        matches!(self, ChannelType::GlobalFeed)
    }
}

/// Channel a whisper posted in `zone` is published to.
pub fn zone_channel(zone: &str) -> String {
    zone.trim().to_ascii_lowercase()
}
