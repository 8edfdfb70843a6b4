//! Dispatch queue and worker configuration.

use serde::{Deserialize, Serialize};

/// Dispatch queue and worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Whether the dispatch worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of jobs processed concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Interval in milliseconds between queue polls when idle.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Maximum delivery attempts per job.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
    /// Base retry delay in milliseconds (doubles each attempt).
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    /// Grace period in seconds to drain in-flight jobs on shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
    /// Seconds after which a claimed job counts as abandoned and is
    /// reclaimed for another worker.
    #[serde(default = "default_lease")]
    pub lease_seconds: u64,
    /// Days after which terminal jobs are deleted by the cleanup task.
    #[serde(default = "default_cleanup_days")]
    pub cleanup_after_days: i64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: default_concurrency(),
            poll_interval_ms: default_poll_interval(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base(),
            shutdown_grace_seconds: default_shutdown_grace(),
            lease_seconds: default_lease(),
            cleanup_after_days: default_cleanup_days(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    10
}

fn default_poll_interval() -> u64 {
    500
}

fn default_max_attempts() -> i32 {
    3
}

fn default_backoff_base() -> u64 {
    2000
}

fn default_shutdown_grace() -> u64 {
    30
}

fn default_lease() -> u64 {
    60
}

fn default_cleanup_days() -> i64 {
    1
}
