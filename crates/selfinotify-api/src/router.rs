//! Route definitions for the SelfiNotify HTTP API.
//!
//! All routes are organized by domain and mounted under `/api`.
//! The router receives `AppState` and passes it to all handlers via Axum's `State` extractor.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(application_routes())
        .merge(notification_routes())
        .merge(queue_routes())
        .merge(stats_routes())
        .merge(health_routes());

    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_upgrade));

    let cors = build_cors_layer(&state);

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Application registration, update, and token lifecycle
fn application_routes() -> Router<AppState> {
    Router::new()
        .route("/applications", get(handlers::application::list))
        .route("/applications", post(handlers::application::create))
        .route("/applications/{id}", get(handlers::application::get))
        .route("/applications/{id}", put(handlers::application::update))
        .route("/applications/{id}", delete(handlers::application::delete))
        .route(
            "/applications/{id}/regenerate-token",
            post(handlers::application::regenerate_token),
        )
}

/// Notification send, retry, history, and stats
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications/send", post(handlers::notification::send))
        .route(
            "/notifications/bulk-send",
            post(handlers::notification::bulk_send),
        )
        .route(
            "/notifications/test",
            post(handlers::notification::send_test),
        )
        .route(
            "/notifications/bulk-delete",
            post(handlers::notification::bulk_delete),
        )
        .route(
            "/notifications/history",
            get(handlers::notification::history),
        )
        .route("/notifications/stats", get(handlers::notification::stats))
        .route("/notifications/{id}", get(handlers::notification::get))
        .route(
            "/notifications/{id}",
            delete(handlers::notification::delete),
        )
        .route(
            "/notifications/{id}/retry",
            post(handlers::notification::retry),
        )
        .route(
            "/notifications/{id}/resend",
            post(handlers::notification::resend),
        )
}

/// Dispatch queue operator surface
fn queue_routes() -> Router<AppState> {
    Router::new()
        .route("/queue/stats", get(handlers::queue::stats))
        .route("/queue/pause", post(handlers::queue::pause))
        .route("/queue/resume", post(handlers::queue::resume))
}

/// Connection statistics
fn stats_routes() -> Router<AppState> {
    Router::new().route("/connections/stats", get(handlers::stats::connections))
}

/// Health endpoints
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}

fn build_cors_layer(state: &AppState) -> CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::Any;

    let cors_config = &state.config.server.cors;

    let mut cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if cors_config.allowed_origins.contains(&"*".to_string()) {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = cors_config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    cors
}
