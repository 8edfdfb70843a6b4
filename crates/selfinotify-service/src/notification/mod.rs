//! Notification send, retry, and history use cases.

pub mod service;

pub use service::{BulkSendReport, NotificationService, SendNotification};
