//! Queued dispatch job entity.

pub mod model;
pub mod payload;
pub mod status;

pub use model::Job;
pub use payload::{DISPATCH_JOB_TYPE, DispatchPayload, job_id_for_notification};
pub use status::JobStatus;
