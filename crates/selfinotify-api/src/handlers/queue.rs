//! Dispatch queue operator handlers.

use axum::extract::State;
use axum::Json;

use selfinotify_worker::QueueStats;

use crate::dto::response::{ApiResponse, MessageResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/queue/stats
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<QueueStats>>> {
    let stats = state.queue.stats().await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// POST /api/queue/pause
pub async fn pause(State(state): State<AppState>) -> Json<ApiResponse<MessageResponse>> {
    state.queue.pause();
    Json(ApiResponse::ok(MessageResponse {
        message: "Queue paused".to_string(),
    }))
}

/// POST /api/queue/resume
pub async fn resume(State(state): State<AppState>) -> Json<ApiResponse<MessageResponse>> {
    state.queue.resume();
    Json(ApiResponse::ok(MessageResponse {
        message: "Queue resumed".to_string(),
    }))
}
