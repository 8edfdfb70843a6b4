//! Worker runner — main loop that polls for jobs and executes them.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time;

use selfinotify_core::config::QueueConfig;

use crate::backoff::retry_delay;
use crate::executor::JobExecutor;
use crate::queue::DispatchQueue;

/// Main worker runner that polls the dispatch queue and executes jobs
#[derive(Debug)]
pub struct WorkerRunner {
    /// Dispatch queue for polling
    queue: Arc<DispatchQueue>,
    /// Job executor for dispatching
    executor: Arc<JobExecutor>,
    /// Queue configuration
    config: QueueConfig,
    /// Worker identifier
    worker_id: String,
}

impl WorkerRunner {
    /// Create a new worker runner
    pub fn new(
        queue: Arc<DispatchQueue>,
        executor: Arc<JobExecutor>,
        config: QueueConfig,
        worker_id: String,
    ) -> Self {
        Self {
            queue,
            executor,
            config,
            worker_id,
        }
    }

    /// Start the worker runner — runs until the cancel signal is received
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            "Worker '{}' started with concurrency={}, poll_interval={}ms",
            self.worker_id,
            self.config.concurrency,
            self.config.poll_interval_ms
        );

        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.concurrency));
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        // A previous instance may have died mid-claim; make its jobs
        // claimable again before taking new work.
        let lease = Duration::from_secs(self.config.lease_seconds);
        if let Err(e) = self.queue.reclaim_stale(lease).await {
            tracing::warn!("Startup stale claim reclaim failed: {}", e);
        }

        loop {
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        tracing::info!("Worker '{}' received shutdown signal", self.worker_id);
                        break;
                    }
                }
                _ = self.poll_and_execute(&semaphore) => {
                    tokio::select! {
                        _ = cancel.changed() => {
                            if *cancel.borrow() {
                                tracing::info!("Worker '{}' shutting down", self.worker_id);
                                break;
                            }
                        }
                        _ = time::sleep(poll_interval) => {}
                    }
                }
            }
        }

        tracing::info!(
            "Worker '{}' waiting for in-flight jobs to complete...",
            self.worker_id
        );

        let max_permits = self.config.concurrency as u32;
        let _ = tokio::time::timeout(
            Duration::from_secs(self.config.shutdown_grace_seconds),
            semaphore.acquire_many(max_permits),
        )
        .await;

        tracing::info!("Worker '{}' shut down complete", self.worker_id);
    }

    /// Poll for a job and execute it if available
    async fn poll_and_execute(&self, semaphore: &Arc<tokio::sync::Semaphore>) {
        if self.queue.is_paused() {
            tracing::trace!("Queue paused, skipping poll");
            return;
        }

        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                tracing::trace!("All worker slots occupied, waiting...");
                return;
            }
        };

        match self.queue.dequeue(&self.worker_id).await {
            Ok(Some(job)) => {
                let queue = Arc::clone(&self.queue);
                let executor = Arc::clone(&self.executor);
                let backoff_base_ms = self.config.backoff_base_ms;

                tokio::spawn(async move {
                    let _permit = permit;
                    let job_id = job.id;

                    tracing::info!(
                        "Processing job: id={}, type='{}', attempt={}/{}",
                        job_id,
                        job.job_type,
                        job.attempts,
                        job.max_attempts
                    );

                    match executor.execute(&job).await {
                        Ok(result) => {
                            if let Err(e) = queue.complete(job_id, result).await {
                                tracing::error!(
                                    "Failed to mark job {} as completed: {}",
                                    job_id,
                                    e
                                );
                            }
                            tracing::info!("Job {} completed successfully", job_id);
                        }
                        Err(err) => {
                            let msg = err.to_string();
                            if err.should_retry() && job.has_attempts_left() {
                                tracing::warn!("Job {} failed (will retry): {}", job_id, msg);
                                let delay = retry_delay(backoff_base_ms, job.attempts);
                                let next_at = Utc::now()
                                    + chrono::Duration::from_std(delay)
                                        .unwrap_or(chrono::Duration::zero());
                                if let Err(e) = queue.retry_later(job_id, next_at, &msg).await {
                                    tracing::error!("Failed to reschedule job {}: {}", job_id, e);
                                }
                            } else {
                                tracing::error!("Job {} failed terminally: {}", job_id, msg);
                                executor.notify_exhausted(&job, &msg).await;
                                if let Err(e) = queue.fail(job_id, &msg).await {
                                    tracing::error!(
                                        "Failed to mark job {} as failed: {}",
                                        job_id,
                                        e
                                    );
                                }
                            }
                        }
                    }
                });
            }
            Ok(None) => {
                drop(permit);
                tracing::trace!("No jobs available");
            }
            Err(e) => {
                drop(permit);
                tracing::error!("Failed to dequeue job: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selfinotify_database::repositories::JobRepository;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn runner_picks_up_config_defaults() {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(250))
            .connect_lazy("postgres://selfinotify@localhost/selfinotify_test")
            .unwrap();
        let queue = Arc::new(DispatchQueue::new(Arc::new(JobRepository::new(pool)), 3));

        let runner = WorkerRunner::new(
            queue,
            Arc::new(JobExecutor::new()),
            selfinotify_core::config::QueueConfig::default(),
            "worker-test".to_string(),
        );

        assert_eq!(runner.config.concurrency, 10);
        assert_eq!(runner.config.max_attempts, 3);
        assert_eq!(runner.config.lease_seconds, 60);
    }
}
