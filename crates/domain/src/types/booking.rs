//! Confirmed (or cancelled) call reservations

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;
use uuid::Uuid;

use crate::impl_status_conversions;

/// Booking lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl_status_conversions!(BookingStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl BookingStatus {
    /// Admin transitions: only a scheduled call can be completed or cancelled.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!((self, next), (Self::Scheduled, Self::Completed | Self::Cancelled))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

impl_status_conversions!(PaymentStatus {
    Paid => "paid",
    Unpaid => "unpaid",
});

/// A reservation of the calendar.
///
/// While `status` is [`BookingStatus::Scheduled`] every step-block in
/// `[start_at, end_at)` is covered by a booking-kind slot lock owned by `id`.
/// Cancelled bookings own no locks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub start_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub name: String,
    pub email: String,
    pub topic: String,
    pub title: String,
    pub status: BookingStatus,
    pub payment_provider: Option<String>,
    pub payment_status: PaymentStatus,
    /// Minor currency units; zero on the free path.
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub amount: i64,
    pub currency: String,
    pub provider_order_id: Option<String>,
    pub provider_payment_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn end_at(&self) -> DateTime<Utc> {
        self.start_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Payment captured but the slot was lost to a race.
    pub fn needs_reconciliation(&self) -> bool {
        self.status == BookingStatus::Cancelled
            && self.payment_status == PaymentStatus::Paid
            && self.amount > 0
    }
}

/// Admin listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingView {
    /// Calls that have not ended the grace period yet.
    #[default]
    Upcoming,
    All,
}

impl_status_conversions!(BookingView {
    Upcoming => "upcoming",
    All => "all",
});

/// Admin listing result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingListing {
    pub time_zone: String,
    pub bookings: Vec<Booking>,
}
