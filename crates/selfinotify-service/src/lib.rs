//! # selfinotify-service
//!
//! Business logic service layer for SelfiNotify. Each service orchestrates
//! repositories, the dispatch queue, and the realtime registry to implement
//! application-level use cases.
//!
//! Services follow constructor injection — all dependencies are provided
//! at construction time via `Arc` references.

pub mod application;
pub mod notification;

pub use application::ApplicationService;
pub use notification::{BulkSendReport, NotificationService, SendNotification};
