//! Channel history reads.

use axum::Json;
use axum::extract::{Path, Query, State};
use validator::Validate;

use aangan_core::AppError;
use aangan_realtime::message::validator::validate_channel_name;

use crate::dto::request::HistoryQuery;
use crate::dto::response::{ApiResponse, ChannelHistoryResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/channels/{channel}/history
///
/// Unknown channels return an empty list.
pub async fn channel_history(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<ChannelHistoryResponse>>, ApiError> {
    query.validate().map_err(AppError::from)?;
    let channel = validate_channel_name(&channel)?;

    let history = state.realtime.pubsub.history(&channel);
    let skip = query
        .limit
        .map(|limit| history.len().saturating_sub(limit))
        .unwrap_or(0);
    let whispers = history
        .iter()
        .skip(skip)
        .map(|w| w.as_ref().clone())
        .collect();

    Ok(Json(ApiResponse::ok(ChannelHistoryResponse {
        channel,
        whispers,
    })))
}
