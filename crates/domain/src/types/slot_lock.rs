//! Slot-lock ledger rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockKind {
    /// Provisional, expires with the payment hold.
    Hold,
    /// Permanent until the booking is cancelled.
    Booking,
}

impl_status_conversions!(LockKind {
    Hold => "hold",
    Booking => "booking",
});

/// Who owns a lock. The kind follows from the owner, so a hold row can never
/// carry a booking id and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum LockOwner {
    Hold(Uuid),
    Booking(Uuid),
}

impl LockOwner {
    pub const fn kind(&self) -> LockKind {
        match self {
            Self::Hold(_) => LockKind::Hold,
            Self::Booking(_) => LockKind::Booking,
        }
    }

    pub const fn id(&self) -> Uuid {
        match self {
            Self::Hold(id) | Self::Booking(id) => *id,
        }
    }
}

impl std::fmt::Display for LockOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// One step-sized block of exclusivity, keyed by its start instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotLock {
    pub block_start: DateTime<Utc>,
    pub owner: LockOwner,
    /// Set for holds only.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SlotLock {
    /// Expired holds count as absent even before they are physically removed.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        match self.owner {
            LockOwner::Booking(_) => true,
            LockOwner::Hold(_) => self.expires_at.is_some_and(|at| at > now),
        }
    }
}
