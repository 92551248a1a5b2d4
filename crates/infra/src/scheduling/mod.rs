//! Cron-driven background jobs
//!
//! The only job is the housekeeping sweep that physically removes expired
//! holds and checkouts. Reads already ignore expired rows, so a stopped or
//! failing sweep never affects booking correctness.

pub mod error;
pub mod sweep_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use sweep_scheduler::{SweepJob, SweepScheduler, SweepSchedulerConfig};
