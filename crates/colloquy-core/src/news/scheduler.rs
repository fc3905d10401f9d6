//! Cron scheduler for the daily news push, wrapping
//! `tokio-cron-scheduler`.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use colloquy_types::error::NewsError;

use crate::admin::JobTrigger;

/// Owns the cron runtime. One instance per process; the daily news job
/// is its only client.
#[derive(Clone)]
pub struct NewsScheduler {
    inner: Arc<RwLock<Option<JobScheduler>>>,
}

impl NewsScheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
        }
    }

    /// Start the scheduler. Must be called before scheduling the job.
    pub async fn start(&self) -> Result<(), NewsError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| NewsError::Schedule(e.to_string()))?;
        scheduler
            .start()
            .await
            .map_err(|e| NewsError::Schedule(e.to_string()))?;

        let mut inner = self.inner.write().await;
        *inner = Some(scheduler);
        info!("news scheduler started");
        Ok(())
    }

    /// Register `job` to fire once a day at `hour:minute` UTC.
    pub async fn schedule_daily(
        &self,
        hour: u32,
        minute: u32,
        job: Arc<dyn JobTrigger>,
    ) -> Result<(), NewsError> {
        if hour > 23 || minute > 59 {
            return Err(NewsError::Schedule(format!(
                "invalid fire time {hour:02}:{minute:02}"
            )));
        }
        let cron_expr = format!("0 {minute} {hour} * * *");

        let inner = self.inner.read().await;
        let scheduler = inner
            .as_ref()
            .ok_or_else(|| NewsError::Schedule("scheduler not started".to_string()))?;

        let cron_job = Job::new_async(cron_expr.as_str(), move |_uuid, _lock| {
            let job = job.clone();
            Box::pin(async move {
                if let Err(err) = job.trigger().await {
                    error!(error = %err, "scheduled news push failed");
                }
            })
        })
        .map_err(|e| NewsError::Schedule(e.to_string()))?;

        scheduler
            .add(cron_job)
            .await
            .map_err(|e| NewsError::Schedule(e.to_string()))?;
        info!(%cron_expr, "daily news job scheduled");
        Ok(())
    }

    /// Stop the scheduler and drop its jobs.
    pub async fn stop(&self) -> Result<(), NewsError> {
        let mut inner = self.inner.write().await;
        if let Some(mut scheduler) = inner.take() {
            scheduler
                .shutdown()
                .await
                .map_err(|e| NewsError::Schedule(e.to_string()))?;
            info!("news scheduler stopped");
        }
        Ok(())
    }
}

impl Default for NewsScheduler {
    fn default() -> Self {
        Self::new()
    }
}
