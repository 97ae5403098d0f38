//! The created-whisper summary pushed to live clients.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::AppError;

/// Maximum zone name length.
pub const MAX_ZONE_LEN: usize = 64;

/// Identifier assigned to a whisper by the persistence layer.
///
/// SQLite deployments hand out integer keys while Postgres deployments use
/// UUID strings, so both shapes are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WhisperId {
    /// Integer primary key.
    Numeric(i64),
    /// String key (usually a UUID).
    Text(String),
}

impl fmt::Display for WhisperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for WhisperId {
    fn from(value: i64) -> Self {
        Self::Numeric(value)
    }
}

impl From<&str> for WhisperId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A whisper as announced after a successful insert.
///
/// Immutable once published; the broadcast core shares it by `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Whisper {
    /// Persistence-layer identifier.
    pub id: WhisperId,
    /// Post body.
    #[validate(length(min = 1, max = 2000, message = "Content must be 1-2000 characters"))]
    pub content: String,
    /// Emotion tag chosen by the author.
    #[validate(length(min = 1, max = 32, message = "Emotion must be 1-32 characters"))]
    pub emotion: String,
    /// Campus zone the whisper was posted in.
    #[validate(custom(function = "validate_zone"))]
    pub zone: String,
    /// Creation time.
    #[serde(default = "chrono::Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Whisper {
    /// Builds a whisper stamped with the current time.
    pub fn new(
        id: impl Into<WhisperId>,
        content: impl Into<String>,
        emotion: impl Into<String>,
        zone: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            emotion: emotion.into(),
            zone: zone.into(),
            timestamp: Utc::now(),
        }
    }

    /// Validates the payload and normalises the zone to lower case.
    ///
    /// This is the single validation point at the producer boundary.
    pub fn validated(mut self) -> Result<Self, AppError> {
        self.zone = self.zone.trim().to_ascii_lowercase();
        self.validate()?;
        Ok(self)
    }
}

/// Whether `zone` is a legal zone name.
///
/// Zones are 1-64 characters of `[a-z0-9_-]` (case-insensitive) and may not
/// begin with `__`, which is reserved for system channels.
pub fn is_valid_zone(zone: &str) -> bool {
    !zone.is_empty()
        && zone.len() <= MAX_ZONE_LEN
        && !zone.starts_with("__")
        && zone
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn validate_zone(zone: &str) -> Result<(), ValidationError> {
    if is_valid_zone(zone) {
        Ok(())
    } else {
        Err(ValidationError::new("zone").with_message(Cow::Borrowed(
            "Zone must be 1-64 characters of [a-z0-9_-] and not start with '__'",
        )))
    }
}
