//! # aangan-api
//!
//! HTTP API layer for Aangan built on Axum.
//!
//! Provides the WebSocket upgrade, the whisper ingest hook used by the
//! CRUD backend, channel history reads, health endpoints, middleware (CORS,
//! logging), DTOs, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use state::AppState;
