//! Notification acceptance, enqueue, operator retry, and history.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use selfinotify_core::error::{AppError, ErrorKind};
use selfinotify_core::result::AppResult;
use selfinotify_database::repositories::notification::{
    NotificationHistoryEntry, NotificationStats,
};
use selfinotify_database::repositories::{ApplicationRepository, NotificationRepository};
use selfinotify_entity::job::payload::{job_id_for_notification, DispatchPayload};
use selfinotify_entity::notification::{CreateNotification, Notification, NotificationStatus};
use selfinotify_worker::DispatchQueue;

/// Maximum notification title length.
const MAX_TITLE_LENGTH: usize = 255;

/// Input for sending one notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendNotification {
    /// Target application.
    pub application_id: i64,
    /// Title (at most 255 characters).
    pub title: String,
    /// Message body.
    pub message: String,
    /// Optional attachment URL.
    pub file_url: Option<String>,
}

/// Per-application outcome of a bulk send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSendOutcome {
    /// Target application.
    pub application_id: i64,
    /// Created notification id on success.
    pub notification_id: Option<i64>,
    /// Error description on failure.
    pub error: Option<String>,
}

/// Outcome of a bulk send across applications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSendReport {
    /// Applications whose notification was accepted.
    pub sent: usize,
    /// Applications whose send failed.
    pub failed: usize,
    /// Per-application breakdown, in input order.
    pub outcomes: Vec<BulkSendOutcome>,
}

/// Accepts notifications, hands them to the dispatch queue, and exposes
/// the operator's history, retry, and stats surfaces.
#[derive(Debug, Clone)]
pub struct NotificationService {
    /// Notification record store.
    notifications: Arc<NotificationRepository>,
    /// Application lookup.
    applications: Arc<ApplicationRepository>,
    /// Durable dispatch queue.
    queue: Arc<DispatchQueue>,
    /// Attempts stamped on new records.
    max_attempts: i32,
}

impl NotificationService {
    /// Creates a new notification service.
    pub fn new(
        notifications: Arc<NotificationRepository>,
        applications: Arc<ApplicationRepository>,
        queue: Arc<DispatchQueue>,
        max_attempts: i32,
    ) -> Self {
        Self {
            notifications,
            applications,
            queue,
            max_attempts,
        }
    }

    /// Accepts a notification and enqueues it for dispatch.
    ///
    /// The record is created in `pending` and advanced to `queued` once the
    /// broker accepted the job. When the broker is unreachable the record is
    /// parked as `failed` so it stays visible and retryable in history, and
    /// the error is propagated to the caller.
    pub async fn send(&self, input: SendNotification) -> AppResult<Notification> {
        self.validate(&input)?;

        let application = self
            .applications
            .find_by_id(input.application_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Application {} not found", input.application_id))
            })?;

        let record = self
            .notifications
            .create(&CreateNotification {
                application_id: application.id,
                title: input.title,
                message: input.message,
                file_url: input.file_url,
                max_retries: self.max_attempts,
            })
            .await?;

        let payload = DispatchPayload {
            notification_id: record.id,
            app_token: application.app_token,
            title: record.title.clone(),
            message: record.message.clone(),
            file_url: record.file_url.clone(),
        };

        match self.queue.enqueue(&payload).await {
            Ok(receipt) => {
                self.notifications.mark_queued(record.id).await?;
                info!(
                    notification_id = record.id,
                    application_id = application.id,
                    job_id = %receipt.job_id,
                    accepted = receipt.accepted,
                    "Notification queued"
                );
                self.require(record.id).await
            }
            Err(e) if e.kind == ErrorKind::QueueUnavailable => {
                warn!(
                    notification_id = record.id,
                    "Broker unreachable, parking notification as failed: {}", e
                );
                self.notifications.mark_failed_to_enqueue(record.id).await?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Sends the same notification to several applications.
    ///
    /// Each application gets its own record and job; one failure does not
    /// abort the rest.
    pub async fn bulk_send(
        &self,
        application_ids: &[i64],
        title: &str,
        message: &str,
        file_url: Option<&str>,
    ) -> AppResult<BulkSendReport> {
        if application_ids.is_empty() {
            return Err(AppError::validation("No target applications given"));
        }

        let mut outcomes = Vec::with_capacity(application_ids.len());
        let mut sent = 0usize;

        for &application_id in application_ids {
            let result = self
                .send(SendNotification {
                    application_id,
                    title: title.to_string(),
                    message: message.to_string(),
                    file_url: file_url.map(str::to_string),
                })
                .await;

            match result {
                Ok(record) => {
                    sent += 1;
                    outcomes.push(BulkSendOutcome {
                        application_id,
                        notification_id: Some(record.id),
                        error: None,
                    });
                }
                Err(e) => outcomes.push(BulkSendOutcome {
                    application_id,
                    notification_id: None,
                    error: Some(e.to_string()),
                }),
            }
        }

        Ok(BulkSendReport {
            sent,
            failed: outcomes.len() - sent,
            outcomes,
        })
    }

    /// Operator retry of a failed notification.
    ///
    /// Resets the record's attempt bookkeeping and re-enqueues the job under
    /// its original deterministic id, so a terminal job is reset rather than
    /// duplicated.
    pub async fn retry(&self, id: i64) -> AppResult<Notification> {
        let record = self.require(id).await?;

        if !record.status.can_retry() {
            return Err(AppError::conflict(format!(
                "Notification {id} is {} and cannot be retried",
                record.status
            )));
        }

        let application = self
            .applications
            .find_by_id(record.application_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Application {} not found", record.application_id))
            })?;

        if !self.notifications.reset_for_retry(id).await? {
            // Lost a race with another operator; the record is no longer failed.
            return Err(AppError::conflict(format!(
                "Notification {id} is no longer retryable"
            )));
        }

        let payload = DispatchPayload {
            notification_id: record.id,
            app_token: application.app_token,
            title: record.title.clone(),
            message: record.message.clone(),
            file_url: record.file_url.clone(),
        };

        match self.queue.enqueue(&payload).await {
            Ok(receipt) => {
                info!(
                    notification_id = id,
                    job_id = %receipt.job_id,
                    accepted = receipt.accepted,
                    "Notification retry queued"
                );
                self.require(id).await
            }
            Err(e) if e.kind == ErrorKind::QueueUnavailable => {
                warn!(
                    notification_id = id,
                    "Broker unreachable during retry, parking notification: {}", e
                );
                // The enqueue itself was an attempt, same as mark_failed_to_enqueue.
                self.notifications.mark_failed(id, 1, Utc::now()).await?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Re-sends a notification as a fresh record.
    ///
    /// Unlike retry, resend works on any record regardless of status: the
    /// original keeps its history and a new record goes through the normal
    /// send pipeline with the same content.
    pub async fn resend(&self, id: i64) -> AppResult<Notification> {
        let record = self.require(id).await?;

        info!(source_id = id, "Resending notification");
        self.send(SendNotification {
            application_id: record.application_id,
            title: record.title,
            message: record.message,
            file_url: record.file_url,
        })
        .await
    }

    /// Sends a canned test notification to verify an application's channel.
    pub async fn send_test(&self, application_id: i64) -> AppResult<Notification> {
        let application = self
            .applications
            .find_by_id(application_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Application {application_id} not found"))
            })?;

        self.send(SendNotification {
            application_id: application.id,
            title: "Test Notification".to_string(),
            message: format!(
                "This is a test notification for \"{}\". If you received this message, \
                 the WebSocket connection is working.",
                application.name
            ),
            file_url: None,
        })
        .await
    }

    /// Gets a notification record by id.
    pub async fn get(&self, id: i64) -> AppResult<Notification> {
        self.require(id).await
    }

    /// Lists history, newest first, optionally filtered.
    pub async fn history(
        &self,
        application_id: Option<i64>,
        status: Option<NotificationStatus>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<NotificationHistoryEntry>> {
        self.notifications
            .find_history(application_id, status, limit.clamp(1, 200), offset.max(0))
            .await
    }

    /// Deletes a notification record from history.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if !self.notifications.delete(id).await? {
            return Err(AppError::not_found(format!("Notification {id} not found")));
        }
        Ok(())
    }

    /// Deletes a batch of notification records. Returns how many were removed.
    pub async fn delete_many(&self, ids: &[i64]) -> AppResult<u64> {
        if ids.is_empty() {
            return Err(AppError::validation("No notification ids given"));
        }
        let deleted = self.notifications.delete_many(ids).await?;
        info!(requested = ids.len(), deleted, "Bulk deleted notifications");
        Ok(deleted)
    }

    /// Aggregate record counts for the operator dashboard.
    pub async fn stats(&self) -> AppResult<NotificationStats> {
        self.notifications.stats().await
    }

    /// The job id the dispatch queue uses for a notification.
    pub fn job_id(&self, notification_id: i64) -> uuid::Uuid {
        job_id_for_notification(notification_id)
    }

    fn validate(&self, input: &SendNotification) -> AppResult<()> {
        if input.title.trim().is_empty() {
            return Err(AppError::validation("Title must not be empty"));
        }
        if input.title.chars().count() > MAX_TITLE_LENGTH {
            return Err(AppError::validation(format!(
                "Title must be at most {MAX_TITLE_LENGTH} characters"
            )));
        }
        if input.message.trim().is_empty() {
            return Err(AppError::validation("Message must not be empty"));
        }
        Ok(())
    }

    async fn require(&self, id: i64) -> AppResult<Notification> {
        self.notifications
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Notification {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selfinotify_database::repositories::JobRepository;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_service() -> NotificationService {
        let pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(250))
            .connect_lazy("postgres://selfinotify@localhost/selfinotify_test")
            .unwrap();
        NotificationService::new(
            Arc::new(NotificationRepository::new(pool.clone())),
            Arc::new(ApplicationRepository::new(pool.clone())),
            Arc::new(DispatchQueue::new(Arc::new(JobRepository::new(pool)), 3)),
            3,
        )
    }

    fn input(title: &str, message: &str) -> SendNotification {
        SendNotification {
            application_id: 1,
            title: title.to_string(),
            message: message.to_string(),
            file_url: None,
        }
    }

    #[tokio::test]
    async fn send_rejects_empty_title() {
        let err = lazy_service().send(input("", "body")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn send_rejects_overlong_title() {
        let long = "x".repeat(256);
        let err = lazy_service().send(input(&long, "body")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn send_accepts_title_at_limit_boundary() {
        let at_limit = "x".repeat(255);
        let service = lazy_service();
        // Validation passes; the lazy pool then fails the lookup, proving
        // the title was not the reason for rejection.
        let err = service.send(input(&at_limit, "body")).await.unwrap_err();
        assert_ne!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn send_rejects_empty_message() {
        let err = lazy_service().send(input("title", " ")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn bulk_send_rejects_empty_target_list() {
        let err = lazy_service()
            .bulk_send(&[], "title", "body", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn delete_many_rejects_empty_id_list() {
        let err = lazy_service().delete_many(&[]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn job_id_matches_queue_identity() {
        let service_id = job_id_for_notification(42);
        assert_eq!(service_id, job_id_for_notification(42));
    }
}
