//! # CallSlot Infrastructure
//!
//! Infrastructure implementations of the core ports.
//!
//! This crate contains:
//! - SQLite repositories and the slot-lock ledger (r2d2 pool)
//! - The Razorpay payment gateway
//! - Email transports (log, Resend)
//! - Configuration loading
//! - The cron-driven housekeeping sweep
//!
//! ## Architecture
//! - Implements traits defined in `callslot-core`
//! - Contains all "impure" code (database, network, environment)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod notifications;
pub mod payments;
pub mod scheduling;

pub use database::*;
pub use errors::InfraError;
pub use http::*;
pub use notifications::{mailer_from_config, LogMailer, ResendMailer};
pub use payments::{sign_payment, RazorpayGateway};
pub use scheduling::{SchedulerError, SweepJob, SweepScheduler, SweepSchedulerConfig};
