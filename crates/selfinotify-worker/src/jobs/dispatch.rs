//! Notification dispatch handler — delivers a notification to its channel.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use selfinotify_database::repositories::NotificationRepository;
use selfinotify_entity::job::payload::{DispatchPayload, DISPATCH_JOB_TYPE};
use selfinotify_entity::job::Job;
use selfinotify_realtime::message::types::OutboundMessage;
use selfinotify_realtime::{ChannelBroadcaster, ConnectionRegistry};

use crate::executor::{JobExecutionError, JobHandler};

/// Delivers queued notifications over the realtime channel.
///
/// Delivery is queue-confirmed: a notification counts as delivered when it
/// was broadcast to at least one connected session. An empty channel is a
/// transient failure so the queue's backoff gives clients time to connect.
#[derive(Debug)]
pub struct NotificationDispatchHandler {
    /// Channel membership lookup.
    registry: Arc<ConnectionRegistry>,
    /// Wire fan-out.
    broadcaster: Arc<ChannelBroadcaster>,
    /// Notification record store.
    notifications: NotificationRepository,
}

impl NotificationDispatchHandler {
    /// Create a new dispatch handler.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        broadcaster: Arc<ChannelBroadcaster>,
        notifications: NotificationRepository,
    ) -> Self {
        Self {
            registry,
            broadcaster,
            notifications,
        }
    }

    fn parse_payload(job: &Job) -> Result<DispatchPayload, JobExecutionError> {
        serde_json::from_value(job.payload.clone()).map_err(|e| {
            JobExecutionError::Permanent(format!("Malformed dispatch payload: {e}"))
        })
    }
}

#[async_trait]
impl JobHandler for NotificationDispatchHandler {
    fn job_type(&self) -> &str {
        DISPATCH_JOB_TYPE
    }

    async fn execute(&self, job: &Job) -> Result<Value, JobExecutionError> {
        let payload = Self::parse_payload(job)?;

        // The membership check is the delivery gate: zero members means
        // nobody can receive the message, so the attempt is retried later.
        let member_count = self.registry.member_count(&payload.app_token);
        if member_count == 0 {
            return Err(JobExecutionError::Transient(format!(
                "No clients connected for app token '{}'",
                payload.app_token
            )));
        }

        let delivered_at = Utc::now();
        let message = OutboundMessage::Notification {
            id: payload.notification_id,
            title: payload.title.clone(),
            message: payload.message.clone(),
            file_url: payload.file_url.clone(),
            sent_at: delivered_at,
            job_id: job.id,
        };

        let reached = self
            .broadcaster
            .broadcast(&payload.app_token, &message)
            .map_err(|e| JobExecutionError::Transient(e.to_string()))?;

        // The broadcast already went out; a record update failure must stay
        // retryable. Re-dispatch may deliver twice, which at-least-once allows.
        self.notifications
            .mark_delivered(payload.notification_id, reached as i32, delivered_at)
            .await
            .map_err(|e| {
                JobExecutionError::Transient(format!(
                    "Broadcast sent but record update failed: {e}"
                ))
            })?;

        tracing::info!(
            notification_id = payload.notification_id,
            app_token = %payload.app_token,
            member_count = reached,
            "Notification delivered"
        );

        Ok(serde_json::json!({
            "member_count": reached,
            "delivered_at": delivered_at,
        }))
    }

    async fn on_exhausted(&self, job: &Job, error: &str) {
        let Ok(payload) = Self::parse_payload(job) else {
            tracing::error!(job_id = %job.id, "Exhausted job has malformed payload");
            return;
        };

        tracing::warn!(
            notification_id = payload.notification_id,
            attempts = job.attempts,
            error,
            "Notification delivery exhausted"
        );

        if let Err(e) = self
            .notifications
            .mark_failed(payload.notification_id, job.attempts, Utc::now())
            .await
        {
            tracing::error!(
                notification_id = payload.notification_id,
                "Failed to record terminal failure: {}",
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use selfinotify_entity::job::payload::job_id_for_notification;
    use selfinotify_entity::job::JobStatus;
    use selfinotify_realtime::ConnectionHandle;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_notifications() -> NotificationRepository {
        // connect_lazy never touches the network until a query runs.
        let pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(250))
            .connect_lazy("postgres://selfinotify@localhost/selfinotify_test")
            .unwrap();
        NotificationRepository::new(pool)
    }

    fn dispatch_job(notification_id: i64, app_token: &str) -> Job {
        let payload = DispatchPayload {
            notification_id,
            app_token: app_token.to_string(),
            title: "Deploy finished".to_string(),
            message: "Build 42 is live".to_string(),
            file_url: None,
        };
        let now = Utc::now();
        Job {
            id: job_id_for_notification(notification_id),
            job_type: DISPATCH_JOB_TYPE.to_string(),
            payload: serde_json::to_value(&payload).unwrap(),
            result: None,
            status: JobStatus::Running,
            attempts: 1,
            max_attempts: 3,
            scheduled_at: None,
            started_at: Some(now),
            completed_at: None,
            error_message: None,
            worker_id: Some("test".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn empty_channel_is_a_transient_failure() {
        let registry = Arc::new(ConnectionRegistry::new(16));
        let broadcaster = Arc::new(ChannelBroadcaster::new(registry.clone()));
        let handler =
            NotificationDispatchHandler::new(registry, broadcaster, lazy_notifications());

        let job = dispatch_job(1, "app_nobody");
        match handler.execute(&job).await {
            Err(JobExecutionError::Transient(msg)) => assert!(msg.contains("app_nobody")),
            other => panic!("expected transient failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_payload_is_permanent() {
        let registry = Arc::new(ConnectionRegistry::new(16));
        let broadcaster = Arc::new(ChannelBroadcaster::new(registry.clone()));
        let handler =
            NotificationDispatchHandler::new(registry, broadcaster, lazy_notifications());

        let mut job = dispatch_job(1, "app_one");
        job.payload = serde_json::json!({"not": "a payload"});

        match handler.execute(&job).await {
            Err(JobExecutionError::Permanent(_)) => {}
            other => panic!("expected permanent failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn connected_members_receive_the_wire_message() {
        let registry = Arc::new(ConnectionRegistry::new(16));
        let broadcaster = Arc::new(ChannelBroadcaster::new(registry.clone()));

        let (handle, mut rx) = ConnectionHandle::new(8);
        registry.join(Arc::new(handle), "app_one");

        // Only the broadcast half runs here; the record update needs a live
        // database, so this test drives the broadcaster directly.
        let job = dispatch_job(7, "app_one");
        let payload: DispatchPayload = serde_json::from_value(job.payload.clone()).unwrap();
        let message = OutboundMessage::Notification {
            id: payload.notification_id,
            title: payload.title,
            message: payload.message,
            file_url: payload.file_url,
            sent_at: Utc::now(),
            job_id: job.id,
        };
        let reached = broadcaster.broadcast(&payload.app_token, &message).unwrap();
        assert_eq!(reached, 1);

        let raw = rx.recv().await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["type"], "notification");
        assert_eq!(json["id"], 7);
        assert_eq!(json["job_id"], job.id.to_string());
    }

    #[tokio::test]
    async fn record_update_failure_after_broadcast_is_transient() {
        let registry = Arc::new(ConnectionRegistry::new(16));
        let broadcaster = Arc::new(ChannelBroadcaster::new(registry.clone()));

        let (handle, mut rx) = ConnectionHandle::new(8);
        registry.join(Arc::new(handle), "app_one");

        // One member is connected, so the broadcast succeeds; the lazy pool
        // then fails the record update. That must come back retryable, not
        // as a permanent internal error.
        let handler =
            NotificationDispatchHandler::new(registry, broadcaster, lazy_notifications());
        let job = dispatch_job(9, "app_one");

        match handler.execute(&job).await {
            Err(JobExecutionError::Transient(msg)) => assert!(msg.contains("record update")),
            other => panic!("expected transient failure, got {other:?}"),
        }

        // The wire message went out before the update failed.
        let raw = rx.recv().await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["type"], "notification");
        assert_eq!(json["id"], 9);
    }
}
