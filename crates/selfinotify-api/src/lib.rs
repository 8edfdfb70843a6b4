//! # selfinotify-api
//!
//! HTTP API layer for SelfiNotify: Axum routes, request/response DTOs,
//! error mapping, and the WebSocket upgrade endpoint.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use router::build_router;
pub use state::AppState;
