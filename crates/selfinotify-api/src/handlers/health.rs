//! Health check handlers.

use axum::extract::State;
use axum::Json;

use selfinotify_database::connection::health_check;

use crate::dto::response::{ApiResponse, DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// GET /api/health/detailed
pub async fn health_detailed(
    State(state): State<AppState>,
) -> Json<ApiResponse<DetailedHealthResponse>> {
    let database = match health_check(&state.db_pool).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "degraded".to_string(),
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            "unreachable".to_string()
        }
    };

    let registry_stats = state.realtime.registry.stats();

    Json(ApiResponse::ok(DetailedHealthResponse {
        status: if database == "connected" { "ok" } else { "degraded" }.to_string(),
        database,
        queue_paused: state.queue.is_paused(),
        ws_connections: registry_stats.total_members,
        channels: registry_stats.channel_count,
    }))
}
