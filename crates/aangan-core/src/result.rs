//! Convenience result type alias for Aangan.

use crate::error::AppError;

/// A specialized `Result` type for Aangan operations.
pub type AppResult<T> = Result<T, AppError>;
