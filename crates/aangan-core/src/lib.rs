//! # aangan-core
//!
//! Core crate for Aangan. Contains configuration schemas, the domain
//! event raised when a whisper is created, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Aangan crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
