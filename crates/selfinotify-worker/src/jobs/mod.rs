//! Job handler implementations.

pub mod dispatch;

pub use dispatch::NotificationDispatchHandler;
