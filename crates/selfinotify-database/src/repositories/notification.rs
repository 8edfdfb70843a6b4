//! Notification record repository implementation.
//!
//! Owns the record status machine persistence: the accepting path calls
//! `mark_queued`/`mark_failed_to_enqueue`, the dispatch worker calls
//! `mark_delivered`/`mark_failed`, and operator retries go through
//! `reset_for_retry`.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use selfinotify_core::error::{AppError, ErrorKind};
use selfinotify_core::result::AppResult;
use selfinotify_entity::notification::{CreateNotification, Notification, NotificationStatus};

/// A history row joined with the owning application's name.
#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct NotificationHistoryEntry {
    /// The notification record.
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub notification: Notification,
    /// Display name of the owning application.
    pub application_name: String,
}

/// Aggregate notification counts for operator statistics.
#[derive(Debug, Clone, Copy, FromRow, serde::Serialize)]
pub struct NotificationStats {
    /// All records.
    pub total: i64,
    /// Records created today.
    pub today: i64,
    /// Records pending or queued.
    pub in_flight: i64,
    /// Delivered records.
    pub delivered: i64,
    /// Failed records.
    pub failed: i64,
}

/// Repository for notification record CRUD and status transitions.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new notification repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new record in `pending` status.
    pub async fn create(&self, data: &CreateNotification) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (application_id, title, message, file_url, max_retries) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(data.application_id)
        .bind(&data.title)
        .bind(&data.message)
        .bind(&data.file_url)
        .bind(data.max_retries)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to create notification", e)
        })
    }

    /// Find a record by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Notification>> {
        sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find notification", e)
            })
    }

    /// List history, newest first, optionally filtered by application and status.
    pub async fn find_history(
        &self,
        application_id: Option<i64>,
        status: Option<NotificationStatus>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<NotificationHistoryEntry>> {
        sqlx::query_as::<_, NotificationHistoryEntry>(
            "SELECT n.*, a.name AS application_name \
             FROM notifications n \
             INNER JOIN applications a ON n.application_id = a.id \
             WHERE ($1::BIGINT IS NULL OR n.application_id = $1) \
               AND ($2::notification_status IS NULL OR n.status = $2) \
             ORDER BY n.sent_at DESC \
             LIMIT $3 OFFSET $4",
        )
        .bind(application_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list notification history", e)
        })
    }

    /// Advance `pending` → `queued` after a successful enqueue.
    pub async fn mark_queued(&self, id: i64) -> AppResult<()> {
        sqlx::query(
            "UPDATE notifications SET status = 'queued' WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark notification queued", e)
        })?;
        Ok(())
    }

    /// Mark a record failed at enqueue time (broker unreachable).
    ///
    /// The record gets attempts = 1 rather than being left queued forever.
    pub async fn mark_failed_to_enqueue(&self, id: i64) -> AppResult<()> {
        sqlx::query(
            "UPDATE notifications SET status = 'failed', delivery_attempts = 1, \
             last_delivery_attempt = NOW() WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark notification failed", e)
        })?;
        Ok(())
    }

    /// Advance `queued` → `delivered` with the worker's verdict: how many
    /// sessions the broadcast reached and when.
    pub async fn mark_delivered(
        &self,
        id: i64,
        member_count: i32,
        delivered_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE notifications SET status = 'delivered', delivered_to = $2, \
             delivered_at = $3, last_delivery_attempt = $3 \
             WHERE id = $1 AND status = 'queued'",
        )
        .bind(id)
        .bind(member_count)
        .bind(delivered_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark notification delivered", e)
        })?;
        Ok(())
    }

    /// Advance `queued` → `failed` after the queue exhausted all attempts.
    pub async fn mark_failed(
        &self,
        id: i64,
        attempts: i32,
        last_attempt_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE notifications SET status = 'failed', delivery_attempts = $2, \
             last_delivery_attempt = $3 WHERE id = $1 AND status = 'queued'",
        )
        .bind(id)
        .bind(attempts)
        .bind(last_attempt_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark notification failed", e)
        })?;
        Ok(())
    }

    /// Operator retry: `failed` → `queued` with the attempt counter reset.
    pub async fn reset_for_retry(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'queued', delivery_attempts = 0, \
             last_delivery_attempt = NULL, delivered_at = NULL, delivered_to = NULL \
             WHERE id = $1 AND status = 'failed'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to reset notification for retry", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a record.
    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete notification", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a batch of records. Returns how many rows were removed.
    pub async fn delete_many(&self, ids: &[i64]) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete notifications", e)
            })?;
        Ok(result.rows_affected())
    }

    /// Aggregate counts for the operator dashboard.
    pub async fn stats(&self) -> AppResult<NotificationStats> {
        sqlx::query_as::<_, NotificationStats>(
            "SELECT COUNT(*) AS total, \
             COUNT(*) FILTER (WHERE sent_at::date = CURRENT_DATE) AS today, \
             COUNT(*) FILTER (WHERE status IN ('pending', 'queued')) AS in_flight, \
             COUNT(*) FILTER (WHERE status = 'delivered') AS delivered, \
             COUNT(*) FILTER (WHERE status = 'failed') AS failed \
             FROM notifications",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load notification stats", e)
        })
    }
}
