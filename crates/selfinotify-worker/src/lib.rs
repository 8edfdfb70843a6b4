//! Background dispatch processing for SelfiNotify.
//!
//! This crate provides:
//! - A durable dispatch queue with idempotent enqueue and pause/resume
//! - A worker runner that polls for and executes queued jobs
//! - A job executor that dispatches jobs to the correct handler
//! - The notification delivery handler and exponential backoff policy
//! - A cron scheduler for periodic queue maintenance

pub mod backoff;
pub mod executor;
pub mod jobs;
pub mod queue;
pub mod runner;
pub mod scheduler;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use queue::{DispatchQueue, EnqueueReceipt, QueueStats};
pub use runner::WorkerRunner;
pub use scheduler::CronScheduler;
