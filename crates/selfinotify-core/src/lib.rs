//! # selfinotify-core
//!
//! Shared foundation for SelfiNotify: configuration schemas, the unified
//! application error type, and the application-token generator.

pub mod config;
pub mod error;
pub mod result;
pub mod token;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
