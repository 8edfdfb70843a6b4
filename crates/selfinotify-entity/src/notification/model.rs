//! Notification record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::NotificationStatus;

/// One notification record per delivery attempt-group.
///
/// A single send, test-send, or resend creates exactly one record. The queue
/// owns the in-flight attempt counter; the record only mirrors it on
/// terminal failure.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: i64,
    /// Owning application.
    pub application_id: i64,
    /// Title (at most 255 characters).
    pub title: String,
    /// Message body.
    pub message: String,
    /// Optional attachment URL.
    pub file_url: Option<String>,
    /// Current status.
    pub status: NotificationStatus,
    /// Delivery attempts recorded at terminal failure.
    pub delivery_attempts: i32,
    /// Maximum delivery attempts before the record fails.
    pub max_retries: i32,
    /// Timestamp of the last delivery attempt.
    pub last_delivery_attempt: Option<DateTime<Utc>>,
    /// When the record was created (accepted for sending).
    pub sent_at: DateTime<Utc>,
    /// When the record was delivered (broadcast to ≥1 session).
    pub delivered_at: Option<DateTime<Utc>>,
    /// How many sessions the delivering broadcast reached.
    pub delivered_to: Option<i32>,
}

/// Data required to create a new notification record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotification {
    /// Owning application.
    pub application_id: i64,
    /// Title.
    pub title: String,
    /// Message body.
    pub message: String,
    /// Optional attachment URL.
    pub file_url: Option<String>,
    /// Maximum delivery attempts.
    pub max_retries: i32,
}
