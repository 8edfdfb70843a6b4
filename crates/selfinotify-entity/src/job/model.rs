//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::JobStatus;

/// A queued unit of dispatch work.
///
/// The job id is derived deterministically from the notification id, so the
/// queue — not the worker — is the single source of truth for attempt
/// counts and in-flight state.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique job identifier (UUIDv5 over the notification id).
    pub id: Uuid,
    /// Job type identifier (e.g., `"notification_dispatch"`).
    pub job_type: String,
    /// Job-specific payload (JSON).
    pub payload: serde_json::Value,
    /// Result data on completion (JSON), e.g. the member count at delivery.
    pub result: Option<serde_json::Value>,
    /// Current job status.
    pub status: JobStatus,
    /// Number of execution attempts so far.
    pub attempts: i32,
    /// Maximum allowed attempts.
    pub max_attempts: i32,
    /// Earliest execution time (None = immediate); set by backoff.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// When the current attempt started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Error message from the last failed attempt.
    pub error_message: Option<String>,
    /// Worker that claimed the job.
    pub worker_id: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Check whether another attempt is allowed after a transient failure.
    pub fn has_attempts_left(&self) -> bool {
        self.attempts < self.max_attempts
    }
}
