//! Domain types and models

pub mod availability;
pub mod booking;
pub mod checkout;
pub mod refund;
pub mod slot_lock;

pub use availability::{AvailabilityDay, AvailabilityReport, Price, WindowHours};
pub use booking::{Booking, BookingListing, BookingStatus, BookingView, PaymentStatus};
pub use checkout::{Checkout, CheckoutSession, CheckoutStatus, PaymentProof, VerifiedCheckout};
pub use refund::{RefundRequest, RefundStatus};
pub use slot_lock::{LockKind, LockOwner, SlotLock};
