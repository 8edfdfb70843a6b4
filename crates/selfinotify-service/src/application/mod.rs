//! Application (tenant) management.

pub mod service;

pub use service::ApplicationService;
