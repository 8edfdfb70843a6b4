//! Cron scheduler for periodic queue maintenance.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use selfinotify_core::config::QueueConfig;
use selfinotify_core::error::AppError;
use selfinotify_core::result::AppResult;

use crate::queue::DispatchQueue;

/// Cron-based scheduler for periodic background tasks
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Dispatch queue for maintenance
    queue: Arc<DispatchQueue>,
    /// Queue settings (cleanup horizon, claim lease)
    config: QueueConfig,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(queue: Arc<DispatchQueue>, config: QueueConfig) -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            queue,
            config,
        })
    }

    /// Register all default scheduled tasks
    pub async fn register_default_tasks(&self) -> AppResult<()> {
        self.register_job_cleanup().await?;
        self.register_stale_reclaim().await?;
        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }

    /// Terminal job cleanup, daily at 2 AM
    async fn register_job_cleanup(&self) -> AppResult<()> {
        let queue = Arc::clone(&self.queue);
        let cleanup_after_days = self.config.cleanup_after_days;
        let job = CronJob::new_async("0 0 2 * * *", move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            Box::pin(async move {
                tracing::debug!("Running terminal job cleanup");
                let cutoff = Utc::now() - Duration::days(cleanup_after_days);
                if let Err(e) = queue.cleanup_terminal(cutoff).await {
                    tracing::error!("Terminal job cleanup failed: {}", e);
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create job_cleanup schedule: {}", e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add job_cleanup schedule: {}", e)))?;

        tracing::info!("Registered: job_cleanup (daily at 2AM)");
        Ok(())
    }

    /// Stale claim reclaim, every minute. Catches workers that crashed
    /// mid-job after the startup sweep already ran.
    async fn register_stale_reclaim(&self) -> AppResult<()> {
        let queue = Arc::clone(&self.queue);
        let lease = std::time::Duration::from_secs(self.config.lease_seconds);
        let job = CronJob::new_async("0 * * * * *", move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            Box::pin(async move {
                tracing::trace!("Running stale claim reclaim");
                if let Err(e) = queue.reclaim_stale(lease).await {
                    tracing::error!("Stale claim reclaim failed: {}", e);
                }
            })
        })
        .map_err(|e| {
            AppError::internal(format!("Failed to create stale_reclaim schedule: {}", e))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add stale_reclaim schedule: {}", e))
        })?;

        tracing::info!("Registered: stale_reclaim (every minute)");
        Ok(())
    }
}
