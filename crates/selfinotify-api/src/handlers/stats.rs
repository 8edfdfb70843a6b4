//! Connection statistics handlers.

use axum::extract::State;
use axum::Json;

use selfinotify_realtime::registry::ConnectionStats;

use crate::dto::response::ApiResponse;
use crate::state::AppState;

/// GET /api/connections/stats
pub async fn connections(State(state): State<AppState>) -> Json<ApiResponse<ConnectionStats>> {
    Json(ApiResponse::ok(state.realtime.registry.stats()))
}
