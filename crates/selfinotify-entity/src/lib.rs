//! # selfinotify-entity
//!
//! Data models shared across the SelfiNotify workspace: applications
//! (tenant channels), notification records and their status machine, and
//! queued dispatch jobs.

pub mod application;
pub mod job;
pub mod notification;
