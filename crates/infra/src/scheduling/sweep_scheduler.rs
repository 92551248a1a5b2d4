//! Housekeeping sweep scheduler.
//!
//! Runs a [`SweepJob`] on a cron schedule. Lifecycle is explicit: `start`
//! spawns a monitor task tied to a cancellation token, `stop` shuts the
//! cron scheduler down and joins the monitor, and every await on the
//! scheduler is wrapped in a timeout.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use callslot_core::HousekeepingService;
//! use callslot_infra::scheduling::{SchedulerResult, SweepScheduler, SweepSchedulerConfig};
//!
//! # async fn example(service: Arc<HousekeepingService>) -> SchedulerResult<()> {
//! let mut scheduler = SweepScheduler::with_config(
//!     SweepSchedulerConfig { cron_expression: "0 */5 * * * *".into(), ..Default::default() },
//!     service,
//! )
//! .await?;
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use callslot_core::HousekeepingService;
use callslot_domain::Result;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Work executed on every tick.
#[async_trait]
pub trait SweepJob: Send + Sync {
    async fn run(&self) -> Result<()>;
}

#[async_trait]
impl SweepJob for HousekeepingService {
    async fn run(&self) -> Result<()> {
        let report = self.sweep().await?;
        if report.expired_holds > 0 || report.expired_checkouts > 0 {
            info!(
                expired_holds = report.expired_holds,
                expired_checkouts = report.expired_checkouts,
                "housekeeping sweep removed stale rows"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SweepSchedulerConfig {
    /// Six-field cron expression (seconds first).
    pub cron_expression: String,
    pub job_timeout: Duration,
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
    pub join_timeout: Duration,
}

impl Default for SweepSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: "0 * * * * *".into(),
            job_timeout: Duration::from_secs(30),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

pub struct SweepScheduler {
    scheduler: Arc<RwLock<JobScheduler>>,
    config: SweepSchedulerConfig,
    job_id: Uuid,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    job: Arc<dyn SweepJob>,
}

impl SweepScheduler {
    pub async fn new(cron_expression: String, job: Arc<dyn SweepJob>) -> SchedulerResult<Self> {
        let config = SweepSchedulerConfig { cron_expression, ..SweepSchedulerConfig::default() };
        Self::with_config(config, job).await
    }

    pub async fn with_config(config: SweepSchedulerConfig, job: Arc<dyn SweepJob>) -> SchedulerResult<Self> {
        let raw_scheduler = JobScheduler::new().await.map_err(SchedulerError::CreationFailed)?;

        let mut scheduler = Self {
            scheduler: Arc::new(RwLock::new(raw_scheduler)),
            config,
            job_id: Uuid::nil(),
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            job,
        };

        scheduler.job_id = scheduler.register_job().await?;
        Ok(scheduler)
    }

    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler = self.scheduler.clone();
        let start_timeout = self.config.start_timeout;
        tokio::time::timeout(start_timeout, async move {
            let guard = scheduler.write().await;
            guard.start().await
        })
        .await
        .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?
        .map_err(SchedulerError::StartFailed)?;

        let cancel = self.cancellation.clone();
        self.monitor_handle = Some(tokio::spawn(async move {
            cancel.cancelled().await;
            debug!("sweep scheduler monitor cancelled");
        }));

        info!(cron = %self.config.cron_expression, "sweep scheduler started");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let scheduler = self.scheduler.clone();
        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, async move {
            let mut guard = scheduler.write().await;
            guard.shutdown().await
        })
        .await
        .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?
        .map_err(SchedulerError::StopFailed)?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
        }

        info!("sweep scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.monitor_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    async fn register_job(&mut self) -> SchedulerResult<Uuid> {
        if self.job_id != Uuid::nil() {
            return Ok(self.job_id);
        }

        let job = self.job.clone();
        let job_timeout = self.config.job_timeout;

        let definition = Job::new_async(self.config.cron_expression.as_str(), move |_id, _lock| {
            let job = job.clone();
            Box::pin(async move {
                let started = Instant::now();
                match tokio::time::timeout(job_timeout, job.run()).await {
                    Ok(Ok(())) => {
                        debug!(elapsed_ms = started.elapsed().as_millis(), "sweep finished");
                    }
                    Ok(Err(err)) => error!(error = %err, "sweep failed"),
                    Err(_) => warn!(timeout_secs = job_timeout.as_secs(), "sweep timed out"),
                }
            })
        })
        .map_err(SchedulerError::JobRegistrationFailed)?;

        let job_id = definition.guid();
        let scheduler = self.scheduler.write().await;
        scheduler.add(definition).await.map_err(SchedulerError::JobRegistrationFailed)?;

        debug!(cron = %self.config.cron_expression, %job_id, "registered sweep job");
        Ok(job_id)
    }
}

impl Drop for SweepScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("SweepScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use callslot_domain::CallSlotError;

    use super::*;

    struct CountingJob {
        runs: AtomicUsize,
        fail: bool,
    }

    impl CountingJob {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self { runs: AtomicUsize::new(0), fail })
        }

        fn run_count(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SweepJob for CountingJob {
        async fn run(&self) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CallSlotError::Database("locked".into()));
            }
            Ok(())
        }
    }

    fn fast_config() -> SweepSchedulerConfig {
        SweepSchedulerConfig {
            cron_expression: "*/1 * * * * *".into(),
            job_timeout: Duration::from_secs(2),
            start_timeout: Duration::from_secs(2),
            stop_timeout: Duration::from_secs(2),
            join_timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn runs_job_on_schedule_and_stops() {
        let job = CountingJob::new(false);
        let mut scheduler = SweepScheduler::with_config(fast_config(), job.clone()).await.expect("scheduler");

        scheduler.start().await.expect("started");
        assert!(scheduler.is_running());
        tokio::time::sleep(Duration::from_millis(2500)).await;
        scheduler.stop().await.expect("stopped");

        assert!(job.run_count() >= 1, "job should run at least once");
        assert!(!scheduler.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failing_job_keeps_scheduler_alive() {
        let job = CountingJob::new(true);
        let mut scheduler = SweepScheduler::with_config(fast_config(), job.clone()).await.expect("scheduler");

        scheduler.start().await.expect("started");
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(scheduler.is_running());
        scheduler.stop().await.expect("stopped");
        assert!(job.run_count() >= 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lifecycle_errors() {
        let mut scheduler =
            SweepScheduler::with_config(fast_config(), CountingJob::new(false)).await.expect("scheduler");
        assert!(matches!(scheduler.stop().await, Err(SchedulerError::NotRunning)));

        scheduler.start().await.expect("started");
        assert!(matches!(scheduler.start().await, Err(SchedulerError::AlreadyRunning)));
        scheduler.stop().await.expect("stopped");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_cron_is_rejected() {
        let config = SweepSchedulerConfig { cron_expression: "every minute".into(), ..fast_config() };
        let result = SweepScheduler::with_config(config, CountingJob::new(false)).await;
        assert!(matches!(result, Err(SchedulerError::JobRegistrationFailed(_))));
    }
}
