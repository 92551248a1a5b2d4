//! Refund requests raised by customers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Requested,
    /// Claimed by an approval while the provider refund is in flight.
    Processing,
    Rejected,
    Refunded,
    Failed,
}

impl_status_conversions!(RefundStatus {
    Requested => "requested",
    Processing => "processing",
    Rejected => "rejected",
    Refunded => "refunded",
    Failed => "failed",
});

/// A refund request. Payment fields are copied from the linked booking when
/// the requester's email matches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub reason: Option<String>,
    pub booking_id: Option<Uuid>,
    pub provider_order_id: Option<String>,
    pub provider_payment_id: Option<String>,
    pub amount_minor: Option<i64>,
    pub currency: Option<String>,
    pub status: RefundStatus,
    pub admin_note: Option<String>,
    pub refund_id: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefundRequest {
    pub fn is_open(&self) -> bool {
        self.status == RefundStatus::Requested
    }
}
