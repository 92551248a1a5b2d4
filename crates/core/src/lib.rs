//! # CallSlot Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Scheduling math, the availability calculator and the booking validator
//! - Port interfaces (traits) for the slot-lock ledger, repositories, the
//!   payment provider, the mailer and the clock
//! - Services: free booking, checkout orchestration, admin transitions,
//!   refund intake, notification dispatch and housekeeping
//!
//! ## Architecture Principles
//! - Only depends on `callslot-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Configuration is passed in explicitly, never read from the environment

pub mod booking;
pub mod housekeeping;
pub mod notifications;
pub mod refunds;
pub mod scheduling;

// Infrastructure ports
pub mod clock;
pub mod ledger_ports;
pub mod payment_ports;

// Re-export specific items to avoid ambiguity
pub use booking::ports::{BookingQuery, BookingRepository, CheckoutRepository};
pub use booking::{BookingService, CheckoutService, VerifyRequest};
pub use clock::{Clock, SystemClock};
pub use housekeeping::{HousekeepingService, SweepReport};
pub use ledger_ports::{ConversionOutcome, SlotLockLedger};
pub use notifications::ports::{EmailMessage, Mailer};
pub use notifications::NotificationDispatcher;
pub use payment_ports::{
    OrderRequest, PaymentGateway, PaymentRecord, ProviderOrder, ProviderRefund, RefundOrder,
};
pub use refunds::ports::{RefundQuery, RefundRequestRepository};
pub use refunds::{RefundIntake, RefundPage, RefundService};
pub use scheduling::{
    AvailabilityService, BookingCandidate, BookingRequest, BookingValidator, ValidationFailure,
    ValidationOutcome,
};
