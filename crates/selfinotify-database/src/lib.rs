//! # selfinotify-database
//!
//! PostgreSQL persistence for SelfiNotify: connection pool management,
//! embedded migrations, and repositories for applications, notification
//! records, and the durable dispatch job queue.

pub mod connection;
pub mod migration;
pub mod repositories;
