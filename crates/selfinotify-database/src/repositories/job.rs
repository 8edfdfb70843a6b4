//! Dispatch job repository implementation.
//!
//! The jobs table is the durable broker: claims use `FOR UPDATE SKIP LOCKED`
//! so concurrent workers never double-process, and the row's attempt counter
//! is the authoritative retry state.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use selfinotify_core::error::{AppError, ErrorKind};
use selfinotify_core::result::AppResult;
use selfinotify_entity::job::{Job, JobStatus};

/// Repository for durable dispatch job storage.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent insert keyed by the deterministic job id.
    ///
    /// Returns `Some(job)` when the job was created or a terminal job was
    /// reset for re-dispatch, `None` when an in-flight job with the same id
    /// already exists (duplicate enqueue is a no-op).
    pub async fn insert_idempotent(
        &self,
        id: Uuid,
        job_type: &str,
        payload: &serde_json::Value,
        max_attempts: i32,
    ) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (id, job_type, payload, max_attempts) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE \
             SET status = 'pending', attempts = 0, error_message = NULL, result = NULL, \
                 scheduled_at = NULL, started_at = NULL, completed_at = NULL, \
                 worker_id = NULL, payload = EXCLUDED.payload, \
                 max_attempts = EXCLUDED.max_attempts, updated_at = NOW() \
             WHERE jobs.status IN ('completed', 'failed', 'cancelled') \
             RETURNING *",
        )
        .bind(id)
        .bind(job_type)
        .bind(payload)
        .bind(max_attempts)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to enqueue job", e))
    }

    /// Claim the next runnable job (`SKIP LOCKED` for concurrent workers).
    ///
    /// Claiming increments the attempt counter, so `attempts` on the
    /// returned job already counts the attempt that is about to run.
    pub async fn claim_next(&self, worker_id: &str) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'running', started_at = NOW(), worker_id = $1, \
             attempts = attempts + 1, updated_at = NOW() \
             WHERE id = ( \
                SELECT id FROM jobs \
                WHERE status = 'pending' \
                AND (scheduled_at IS NULL OR scheduled_at <= NOW()) \
                ORDER BY created_at ASC \
                FOR UPDATE SKIP LOCKED \
                LIMIT 1 \
             ) RETURNING *",
        )
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim job", e))
    }

    /// Find a job by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))
    }

    /// Mark a job as completed with its result.
    pub async fn complete(&self, id: Uuid, result: &serde_json::Value) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'completed', result = $2, completed_at = NOW(), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(result)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to complete job", e))?;
        Ok(())
    }

    /// Park a job in the failed set after its final attempt.
    pub async fn fail(&self, id: Uuid, error_message: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'failed', error_message = $2, completed_at = NOW(), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark job failed", e))?;
        Ok(())
    }

    /// Reschedule a job for a later attempt (backoff).
    ///
    /// The row returns to `pending` with `scheduled_at` in the future; the
    /// attempt counter is left alone — `claim_next` incremented it already.
    pub async fn retry_later(
        &self,
        id: Uuid,
        scheduled_at: DateTime<Utc>,
        error_message: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'pending', scheduled_at = $2, error_message = $3, \
             started_at = NULL, worker_id = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(scheduled_at)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to reschedule job", e))?;
        Ok(())
    }

    /// Requeue running jobs claimed before the cutoff; their worker is
    /// presumed gone (crash, or cut off by the shutdown drain).
    ///
    /// The interrupted attempt stays counted, so a job that keeps killing
    /// its worker still exhausts within `max_attempts`. Rows with no
    /// attempts left are parked in the failed set instead of requeued.
    pub async fn reclaim_stale(&self, claimed_before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE jobs SET \
             status = CASE WHEN attempts >= max_attempts \
                 THEN 'failed'::job_status ELSE 'pending'::job_status END, \
             completed_at = CASE WHEN attempts >= max_attempts THEN NOW() ELSE NULL END, \
             error_message = 'Worker lease expired', \
             started_at = NULL, worker_id = NULL, updated_at = NOW() \
             WHERE status = 'running' AND started_at < $1",
        )
        .bind(claimed_before)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to reclaim stale jobs", e))?;
        Ok(result.rows_affected())
    }

    /// Count jobs with the given status.
    pub async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM jobs WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))
    }

    /// Count pending jobs whose backoff delay has not yet elapsed.
    pub async fn count_delayed(&self) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM jobs WHERE status = 'pending' AND scheduled_at > NOW()",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count delayed jobs", e))
    }

    /// Delete terminal jobs older than the cutoff.
    pub async fn delete_terminal_before(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM jobs WHERE status IN ('completed', 'failed', 'cancelled') \
             AND updated_at < $1",
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to clean up jobs", e))?;
        Ok(result.rows_affected())
    }
}
