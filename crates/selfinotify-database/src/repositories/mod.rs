//! Repository implementations, one per aggregate.

pub mod application;
pub mod job;
pub mod notification;

pub use application::ApplicationRepository;
pub use job::JobRepository;
pub use notification::NotificationRepository;
