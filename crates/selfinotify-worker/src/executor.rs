//! Job executor — dispatches jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use selfinotify_core::error::AppError;
use selfinotify_entity::job::Job;

/// Trait for job handler implementations
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// Get the job type this handler processes
    fn job_type(&self) -> &str;

    /// Execute the job with the given payload
    async fn execute(&self, job: &Job) -> Result<Value, JobExecutionError>;

    /// Called once when the job's attempts are exhausted or it fails
    /// permanently, before the job is parked in the failed set.
    async fn on_exhausted(&self, _job: &Job, _error: &str) {}
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure — do not retry
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure — may retry
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

impl JobExecutionError {
    /// Whether the runner may schedule another attempt after this error.
    ///
    /// Internal errors defer to the underlying kind, so a broker or
    /// transport blip mid-job is retried rather than parked as permanent.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transient(_) => true,
            Self::Permanent(_) => false,
            Self::Internal(err) => err.is_retryable(),
        }
    }
}

/// Dispatches jobs to the appropriate handler based on job_type
#[derive(Debug)]
pub struct JobExecutor {
    /// Registered job handlers by type
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    /// Create a new job executor
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a job handler
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        tracing::info!("Registered job handler for type '{}'", job_type);
        self.handlers.insert(job_type, handler);
    }

    /// Execute a job by dispatching to the correct handler
    pub async fn execute(&self, job: &Job) -> Result<Value, JobExecutionError> {
        let handler = self.handler_for(&job.job_type)?;

        tracing::info!(
            "Executing job: id={}, type='{}', attempt={}/{}",
            job.id,
            job.job_type,
            job.attempts,
            job.max_attempts
        );

        handler.execute(job).await
    }

    /// Run the handler's exhaustion hook for a terminally failed job.
    pub async fn notify_exhausted(&self, job: &Job, error: &str) {
        if let Ok(handler) = self.handler_for(&job.job_type) {
            handler.on_exhausted(job, error).await;
        }
    }

    /// Check if a handler is registered for a job type
    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    fn handler_for(&self, job_type: &str) -> Result<&Arc<dyn JobHandler>, JobExecutionError> {
        self.handlers.get(job_type).ok_or_else(|| {
            JobExecutionError::Permanent(format!(
                "No handler registered for job type '{job_type}'"
            ))
        })
    }
}

impl Default for JobExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use selfinotify_entity::job::JobStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    #[derive(Debug)]
    struct CountingHandler {
        executions: AtomicUsize,
        exhaustions: AtomicUsize,
    }

    #[async_trait]
    impl JobHandler for CountingHandler {
        fn job_type(&self) -> &str {
            "counting"
        }

        async fn execute(&self, _job: &Job) -> Result<Value, JobExecutionError> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::json!({"ok": true}))
        }

        async fn on_exhausted(&self, _job: &Job, _error: &str) {
            self.exhaustions.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn job(job_type: &str) -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            job_type: job_type.to_string(),
            payload: serde_json::json!({}),
            result: None,
            status: JobStatus::Running,
            attempts: 1,
            max_attempts: 3,
            scheduled_at: None,
            started_at: Some(now),
            completed_at: None,
            error_message: None,
            worker_id: Some("test".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn dispatches_to_registered_handler() {
        let handler = Arc::new(CountingHandler {
            executions: AtomicUsize::new(0),
            exhaustions: AtomicUsize::new(0),
        });
        let mut executor = JobExecutor::new();
        executor.register(handler.clone());

        let result = executor.execute(&job("counting")).await.unwrap();
        assert_eq!(result["ok"], true);
        assert_eq!(handler.executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_job_type_is_permanent() {
        let executor = JobExecutor::new();
        match executor.execute(&job("missing")).await {
            Err(JobExecutionError::Permanent(msg)) => assert!(msg.contains("missing")),
            other => panic!("expected permanent failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exhaustion_hook_reaches_handler() {
        let handler = Arc::new(CountingHandler {
            executions: AtomicUsize::new(0),
            exhaustions: AtomicUsize::new(0),
        });
        let mut executor = JobExecutor::new();
        executor.register(handler.clone());

        executor.notify_exhausted(&job("counting"), "boom").await;
        assert_eq!(handler.exhaustions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retry_classification_follows_error_kind() {
        assert!(JobExecutionError::Transient("no clients".to_string()).should_retry());
        assert!(!JobExecutionError::Permanent("bad payload".to_string()).should_retry());
        assert!(JobExecutionError::Internal(AppError::transport("socket gone")).should_retry());
        assert!(JobExecutionError::Internal(AppError::queue_unavailable("down")).should_retry());
        assert!(!JobExecutionError::Internal(AppError::validation("bad title")).should_retry());
    }
}
