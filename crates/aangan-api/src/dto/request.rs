//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query string for the channel history endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct HistoryQuery {
    /// Return only the most recent `limit` entries.
    #[validate(range(min = 1, max = 1000, message = "limit must be between 1 and 1000"))]
    pub limit: Option<usize>,
}
