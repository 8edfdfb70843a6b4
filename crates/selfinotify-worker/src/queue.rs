//! Durable dispatch queue over the jobs table.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use selfinotify_core::error::AppError;
use selfinotify_core::result::AppResult;
use selfinotify_database::repositories::JobRepository;
use selfinotify_entity::job::payload::{job_id_for_notification, DispatchPayload, DISPATCH_JOB_TYPE};
use selfinotify_entity::job::{Job, JobStatus};

/// Outcome of an enqueue call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueReceipt {
    /// Whether a job row was created or reset for re-dispatch. `false`
    /// means an in-flight job for the same notification already exists.
    pub accepted: bool,
    /// Deterministic job id for the notification.
    pub job_id: Uuid,
}

/// Queue depth snapshot for the operator stats surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    /// Jobs ready to run now.
    pub waiting: i64,
    /// Jobs currently claimed by a worker.
    pub active: i64,
    /// Jobs that completed successfully.
    pub completed: i64,
    /// Jobs that exhausted their attempts.
    pub failed: i64,
    /// Jobs waiting out a backoff delay.
    pub delayed: i64,
    /// All of the above.
    pub total: i64,
}

/// Dispatch queue for enqueuing and settling delivery work.
///
/// The jobs table is the broker; this type adds the dispatch-specific
/// contract on top: deterministic job identity, the paused flag, and
/// error mapping to `QueueUnavailable` so callers can tell a broker
/// outage apart from a delivery failure.
#[derive(Debug, Clone)]
pub struct DispatchQueue {
    /// Job repository for database persistence.
    repo: Arc<JobRepository>,
    /// Maximum attempts stamped on new jobs.
    max_attempts: i32,
    /// When set, the worker stops claiming; enqueue still works.
    paused: Arc<AtomicBool>,
}

impl DispatchQueue {
    /// Create a new dispatch queue.
    pub fn new(repo: Arc<JobRepository>, max_attempts: i32) -> Self {
        Self {
            repo,
            max_attempts,
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Enqueue a dispatch job for a notification.
    ///
    /// Idempotent: the job id is derived from the notification id, so a
    /// duplicate enqueue while a job is in flight is a no-op and the
    /// receipt reports `accepted: false`. Enqueuing after the previous job
    /// reached a terminal state resets that job for a fresh dispatch.
    pub async fn enqueue(&self, payload: &DispatchPayload) -> AppResult<EnqueueReceipt> {
        let job_id = job_id_for_notification(payload.notification_id);
        let body = serde_json::to_value(payload)?;

        let inserted = self
            .repo
            .insert_idempotent(job_id, DISPATCH_JOB_TYPE, &body, self.max_attempts)
            .await
            .map_err(|e| AppError::queue_unavailable(format!("Failed to enqueue job: {e}")))?;

        let accepted = inserted.is_some();
        tracing::debug!(
            job_id = %job_id,
            notification_id = payload.notification_id,
            accepted,
            "Enqueued dispatch job"
        );

        Ok(EnqueueReceipt { accepted, job_id })
    }

    /// Claim the next runnable job for the given worker.
    pub async fn dequeue(&self, worker_id: &str) -> AppResult<Option<Job>> {
        let job = self.repo.claim_next(worker_id).await?;
        if let Some(job) = &job {
            tracing::debug!(
                job_id = %job.id,
                attempt = job.attempts,
                max_attempts = job.max_attempts,
                "Dequeued job"
            );
        }
        Ok(job)
    }

    /// Mark a job as completed with its result.
    pub async fn complete(&self, job_id: Uuid, result: serde_json::Value) -> AppResult<()> {
        self.repo.complete(job_id, &result).await?;
        tracing::debug!(job_id = %job_id, "Job completed");
        Ok(())
    }

    /// Park a job in the failed set after its final attempt.
    pub async fn fail(&self, job_id: Uuid, error: &str) -> AppResult<()> {
        self.repo.fail(job_id, error).await?;
        tracing::debug!(job_id = %job_id, error, "Job failed");
        Ok(())
    }

    /// Reschedule a job for a later attempt.
    pub async fn retry_later(
        &self,
        job_id: Uuid,
        scheduled_at: DateTime<Utc>,
        error: &str,
    ) -> AppResult<()> {
        self.repo.retry_later(job_id, scheduled_at, error).await?;
        tracing::debug!(job_id = %job_id, scheduled_at = %scheduled_at, "Job rescheduled");
        Ok(())
    }

    /// Requeue jobs whose worker vanished mid-claim.
    ///
    /// A `running` row older than the lease goes back to `pending` (or to
    /// the failed set when its attempts are spent), so a worker crash or an
    /// over-long shutdown drain never strands a job. At-least-once holds: a
    /// slow job that outlives its lease may run twice.
    pub async fn reclaim_stale(&self, lease: Duration) -> AppResult<u64> {
        let cutoff =
            Utc::now() - chrono::Duration::from_std(lease).unwrap_or(chrono::Duration::zero());
        let reclaimed = self.repo.reclaim_stale(cutoff).await?;
        if reclaimed > 0 {
            tracing::warn!(reclaimed, "Reclaimed stale job claims");
        }
        Ok(reclaimed)
    }

    /// Stop the worker from claiming new jobs. Idempotent; in-flight jobs
    /// finish and enqueue keeps accepting.
    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            tracing::info!("Dispatch queue paused");
        }
    }

    /// Resume claiming. Idempotent.
    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            tracing::info!("Dispatch queue resumed");
        }
    }

    /// Whether the queue is currently paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Queue depth snapshot.
    ///
    /// `waiting` excludes jobs still inside their backoff window; those are
    /// reported separately as `delayed`.
    pub async fn stats(&self) -> AppResult<QueueStats> {
        let pending = self.repo.count_by_status(JobStatus::Pending).await?;
        let active = self.repo.count_by_status(JobStatus::Running).await?;
        let completed = self.repo.count_by_status(JobStatus::Completed).await?;
        let failed = self.repo.count_by_status(JobStatus::Failed).await?;
        let delayed = self.repo.count_delayed().await?;

        let waiting = (pending - delayed).max(0);
        Ok(QueueStats {
            waiting,
            active,
            completed,
            failed,
            delayed,
            total: waiting + active + completed + failed + delayed,
        })
    }

    /// Delete terminal jobs older than the cutoff. Returns the count removed.
    pub async fn cleanup_terminal(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let removed = self.repo.delete_terminal_before(before).await?;
        if removed > 0 {
            tracing::info!(removed, "Cleaned up terminal jobs");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selfinotify_core::error::ErrorKind;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_queue() -> DispatchQueue {
        // connect_lazy never touches the network until a query runs.
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(250))
            .connect_lazy("postgres://selfinotify@localhost/selfinotify_test")
            .unwrap();
        DispatchQueue::new(Arc::new(JobRepository::new(pool)), 3)
    }

    #[tokio::test]
    async fn pause_and_resume_are_idempotent() {
        let queue = lazy_queue();
        assert!(!queue.is_paused());

        queue.pause();
        queue.pause();
        assert!(queue.is_paused());

        queue.resume();
        queue.resume();
        assert!(!queue.is_paused());
    }

    #[tokio::test]
    async fn paused_flag_is_shared_across_clones() {
        let queue = lazy_queue();
        let clone = queue.clone();

        queue.pause();
        assert!(clone.is_paused());

        clone.resume();
        assert!(!queue.is_paused());
    }

    #[tokio::test]
    async fn reclaim_stale_surfaces_broker_errors() {
        let queue = lazy_queue();
        let err = queue
            .reclaim_stale(Duration::from_secs(60))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Database);
    }
}
