//! # CallSlot Domain
//!
//! Business domain types for the call-slot booking service.
//!
//! This crate contains:
//! - Booking, checkout, slot-lock and refund records
//! - Domain error types and Result definitions
//! - Configuration structures and the scheduling config resolver
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other CallSlot crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
