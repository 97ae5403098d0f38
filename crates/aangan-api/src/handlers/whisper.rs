//! Producer hook: the CRUD backend announces created whispers here.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use tracing::{debug, warn};

use aangan_core::error::AppError;
use aangan_core::events::Whisper;

use crate::dto::response::{ApiResponse, PublishResponse};
use crate::error::ApiError;
use crate::extractors::ApiJson;
use crate::state::AppState;

/// Header carrying the shared ingest secret.
pub const INGEST_TOKEN_HEADER: &str = "x-aangan-ingest-token";

/// POST /api/internal/whispers
pub async fn whisper_created(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(whisper): ApiJson<Whisper>,
) -> Result<(StatusCode, Json<ApiResponse<PublishResponse>>), ApiError> {
    if let Some(expected) = state.config.realtime.ingest_token.as_deref() {
        let presented = headers
            .get(INGEST_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());
        if presented != Some(expected) {
            warn!("Rejected whisper ingest with missing or wrong token");
            return Err(AppError::unauthorized("Missing or invalid ingest token").into());
        }
    }

    let id = whisper.id.clone();
    let channels = state.realtime.bridge.notify_whisper_created(whisper)?;
    debug!(whisper_id = %id, channels = ?channels, "Whisper ingested");

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::ok(PublishResponse { channels })),
    ))
}
