//! Notification record entity and status machine.

pub mod model;
pub mod status;

pub use model::{CreateNotification, Notification};
pub use status::NotificationStatus;
