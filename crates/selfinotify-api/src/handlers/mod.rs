//! HTTP and WebSocket handlers.

pub mod application;
pub mod health;
pub mod notification;
pub mod queue;
pub mod stats;
pub mod ws;
