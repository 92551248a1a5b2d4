//! Scheduler error types

use callslot_domain::CallSlotError;
use thiserror::Error;
use tokio_cron_scheduler::JobSchedulerError;

use crate::errors::InfraError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler already running")]
    AlreadyRunning,

    #[error("Scheduler not running")]
    NotRunning,

    #[error("Failed to create scheduler: {0}")]
    CreationFailed(JobSchedulerError),

    #[error("Failed to start scheduler: {0}")]
    StartFailed(JobSchedulerError),

    #[error("Failed to stop scheduler: {0}")]
    StopFailed(JobSchedulerError),

    /// Usually an invalid cron expression.
    #[error("Failed to register job: {0}")]
    JobRegistrationFailed(JobSchedulerError),

    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let mapped = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                CallSlotError::Validation(err.to_string())
            }
            SchedulerError::JobRegistrationFailed(_) => CallSlotError::Config(err.to_string()),
            _ => CallSlotError::Internal(err.to_string()),
        };
        Self(mapped)
    }
}

impl From<SchedulerError> for CallSlotError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
