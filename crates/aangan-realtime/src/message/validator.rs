//! Inbound frame validation rules.

use aangan_core::error::AppError;

use crate::channel::types::ChannelType;

/// Maximum allowed inbound frame size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024;

/// Validates a raw inbound frame before parsing.
pub fn validate_inbound(raw: &str) -> Result<(), AppError> {
    if raw.len() > MAX_MESSAGE_SIZE {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {MAX_MESSAGE_SIZE} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty message"));
    }

    Ok(())
}

/// Validates a client-supplied channel name and returns its canonical form.
pub fn validate_channel_name(channel: &str) -> Result<String, AppError> {
    ChannelType::parse(channel).map(|c| c.to_channel_string())
}
