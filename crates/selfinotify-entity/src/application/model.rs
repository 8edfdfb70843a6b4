//! Application entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered client application.
///
/// The `app_token` doubles as the application's channel name: every session
/// that authenticates with the token joins the channel it names.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    /// Unique application identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Platform tag (e.g., `"android"`, `"ios"`, `"web"`).
    pub platform: String,
    /// Opaque unique channel token. Immutable except via explicit
    /// regeneration, which invalidates the old value for all sessions.
    pub app_token: String,
    /// When the application was registered.
    pub created_at: DateTime<Utc>,
    /// When the application was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to register a new application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApplication {
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Platform tag.
    pub platform: String,
}
