//! Dispatch job payload and deterministic job identity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job type handled by the notification dispatch worker.
pub const DISPATCH_JOB_TYPE: &str = "notification_dispatch";

/// Namespace for deriving job ids from notification ids.
const JOB_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6e, 0x1f, 0x1b, 0x2a, 0x9c, 0x41, 0x4d, 0x8f, 0xa0, 0x37, 0x5c, 0x84, 0xe6, 0x02, 0x7d, 0x19,
]);

/// Payload carried by a notification dispatch job.
///
/// The payload is a snapshot taken at enqueue time; the worker does not
/// re-read the notification record to build the wire message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchPayload {
    /// The notification record this job delivers.
    pub notification_id: i64,
    /// Channel token of the owning application.
    pub app_token: String,
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub message: String,
    /// Optional attachment URL.
    pub file_url: Option<String>,
}

/// Derive the job id for a notification.
///
/// UUIDv5 over the notification id, so enqueuing the same notification twice
/// always targets the same job row (idempotent enqueue).
pub fn job_id_for_notification(notification_id: i64) -> Uuid {
    Uuid::new_v5(&JOB_ID_NAMESPACE, &notification_id.to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_is_deterministic() {
        assert_eq!(job_id_for_notification(42), job_id_for_notification(42));
    }

    #[test]
    fn distinct_notifications_get_distinct_job_ids() {
        assert_ne!(job_id_for_notification(1), job_id_for_notification(2));
    }

    #[test]
    fn payload_round_trips_through_json() {
        let payload = DispatchPayload {
            notification_id: 7,
            app_token: "app_deadbeef".to_string(),
            title: "Test".to_string(),
            message: "hello".to_string(),
            file_url: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["notification_id"], 7);
        assert_eq!(json["app_token"], "app_deadbeef");
        let back: DispatchPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }
}
