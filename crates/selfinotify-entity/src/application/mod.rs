//! Application (tenant channel) entity.

pub mod model;

pub use model::{Application, CreateApplication};
