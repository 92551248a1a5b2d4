//! Domain constants
//!
//! Centralized location for booking rules that are not configurable.

/// Call durations (minutes) a requester may pick.
pub const ALLOWED_DURATIONS: [u32; 2] = [30, 60];

/// How long a checkout record is retained for reconciliation.
pub const CHECKOUT_RETENTION_DAYS: i64 = 30;

/// Admin "upcoming" view also shows calls that started this recently.
pub const UPCOMING_GRACE_MINUTES: i64 = 60;

/// Prefix for provider order receipts.
pub const ORDER_RECEIPT_PREFIX: &str = "call_";

/// Payment provider label stored on paid bookings.
pub const PAYMENT_PROVIDER_RAZORPAY: &str = "razorpay";

// Refund listing bounds
pub const REFUND_LIST_DEFAULT_LIMIT: u32 = 100;
pub const REFUND_LIST_MAX_LIMIT: u32 = 500;
pub const REFUND_LIST_MAX_SKIP: u32 = 100_000;

/// Message shown when payment succeeded but the held slot was taken meanwhile.
pub const MSG_PAID_SLOT_GONE: &str =
    "Payment received, but the selected slot is no longer available. Please check your email.";

/// Message shown when payment succeeded but the slot could not be confirmed.
pub const MSG_PAID_SLOT_UNCONFIRMED: &str =
    "Payment received, but we could not confirm the slot. Please check your email.";

/// Whether `minutes` is one of the bookable call durations.
pub fn is_allowed_duration(minutes: u32) -> bool {
    ALLOWED_DURATIONS.contains(&minutes)
}
