//! Provisional, time-boxed payment intents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;
use uuid::Uuid;

use super::booking::Booking;
use crate::impl_status_conversions;

/// Checkout lifecycle. Only `created -> paid` is driven by the service;
/// `expired` and `cancelled` are reserved for operator tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStatus {
    Created,
    Paid,
    Expired,
    Cancelled,
}

impl_status_conversions!(CheckoutStatus {
    Created => "created",
    Paid => "paid",
    Expired => "expired",
    Cancelled => "cancelled",
});

/// A pending paid booking. Its `id` doubles as the hold owner id in the
/// slot-lock ledger and as the id of the booking it turns into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkout {
    pub id: Uuid,
    pub start_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub name: String,
    pub email: String,
    pub topic: String,
    pub title: String,
    pub amount: i64,
    pub currency: String,
    pub provider_order_id: String,
    pub provider_payment_id: Option<String>,
    pub booking_id: Option<Uuid>,
    pub status: CheckoutStatus,
    /// End of the payment hold.
    pub hold_expires_at: DateTime<Utc>,
    /// Retention deadline of this record; unrelated to the hold.
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Checkout {
    pub fn is_hold_expired(&self, now: DateTime<Utc>) -> bool {
        self.hold_expires_at <= now
    }

    /// Already finalized with a linked booking.
    pub fn paid_booking_id(&self) -> Option<Uuid> {
        match self.status {
            CheckoutStatus::Paid => self.booking_id,
            _ => None,
        }
    }
}

/// Returned by checkout initiation: everything the client needs to open
/// the provider's payment sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub checkout_id: Uuid,
    pub hold_expires_at: DateTime<Utc>,
    pub key_id: String,
    pub order_id: String,
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub amount: i64,
    pub currency: String,
    pub time_zone: String,
}

/// Client-supplied proof of payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProof {
    pub checkout_id: Uuid,
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Result of checkout verification.
///
/// `message` is set only when payment was captured but the slot could not
/// be confirmed; the booking is then `cancelled` and awaits a refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedCheckout {
    pub booking: Booking,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
