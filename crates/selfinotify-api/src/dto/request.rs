//! Request DTOs.

use serde::{Deserialize, Serialize};
use validator::Validate;

use selfinotify_entity::notification::NotificationStatus;

/// Body for registering or updating an application.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApplicationRequest {
    /// Display name.
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    /// Optional description.
    #[validate(length(max = 500, message = "description must be at most 500 characters"))]
    pub description: Option<String>,
    /// Platform tag.
    #[validate(length(min = 1, max = 50, message = "platform must be 1-50 characters"))]
    pub platform: String,
}

/// Body for sending one notification.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendNotificationRequest {
    /// Target application.
    pub application_id: i64,
    /// Title.
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub title: String,
    /// Message body.
    #[validate(length(min = 1, message = "message must not be empty"))]
    pub message: String,
    /// Optional attachment URL.
    #[validate(url(message = "file_url must be a valid URL"))]
    pub file_url: Option<String>,
}

/// Body for sending the same notification to several applications.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BulkSendRequest {
    /// Target applications.
    #[validate(length(min = 1, message = "at least one application id is required"))]
    pub application_ids: Vec<i64>,
    /// Title.
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub title: String,
    /// Message body.
    #[validate(length(min = 1, message = "message must not be empty"))]
    pub message: String,
    /// Optional attachment URL.
    #[validate(url(message = "file_url must be a valid URL"))]
    pub file_url: Option<String>,
}

/// Body for sending a canned test notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSendRequest {
    /// Application whose channel to verify.
    pub application_id: i64,
}

/// Body for deleting several notification records at once.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BulkDeleteRequest {
    /// Records to delete.
    #[validate(length(min = 1, message = "at least one notification id is required"))]
    pub ids: Vec<i64>,
}

/// Query parameters for the notification history listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Restrict to one application.
    pub application_id: Option<i64>,
    /// Restrict to one status.
    pub status: Option<NotificationStatus>,
    /// Page size (default 50, capped at 200).
    pub limit: Option<i64>,
    /// Page offset.
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_request_validation() {
        let valid = SendNotificationRequest {
            application_id: 1,
            title: "Deploy".to_string(),
            message: "done".to_string(),
            file_url: None,
        };
        assert!(valid.validate().is_ok());

        let overlong = SendNotificationRequest {
            title: "x".repeat(256),
            ..valid.clone()
        };
        assert!(overlong.validate().is_err());

        let bad_url = SendNotificationRequest {
            file_url: Some("not a url".to_string()),
            ..valid
        };
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn bulk_request_needs_targets() {
        let req = BulkSendRequest {
            application_ids: vec![],
            title: "t".to_string(),
            message: "m".to_string(),
            file_url: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn bulk_delete_needs_ids() {
        let empty = BulkDeleteRequest { ids: vec![] };
        assert!(empty.validate().is_err());

        let some = BulkDeleteRequest { ids: vec![1, 2] };
        assert!(some.validate().is_ok());
    }
}
