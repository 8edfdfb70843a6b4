//! Application state shared across all handlers.

use std::sync::Arc;

use sqlx::PgPool;

use selfinotify_core::config::AppConfig;
use selfinotify_realtime::server::RealtimeEngine;
use selfinotify_service::{ApplicationService, NotificationService};
use selfinotify_worker::DispatchQueue;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// PostgreSQL connection pool
    pub db_pool: PgPool,
    /// WebSocket realtime engine
    pub realtime: Arc<RealtimeEngine>,
    /// Durable dispatch queue
    pub queue: Arc<DispatchQueue>,
    /// Application service
    pub application_service: Arc<ApplicationService>,
    /// Notification service
    pub notification_service: Arc<NotificationService>,
}
