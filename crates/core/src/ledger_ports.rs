//! Slot-lock ledger port
//!
//! The ledger is the only cross-request coordination mechanism. Every
//! implementation must enforce "one live lock per block start" with a
//! storage-level uniqueness guarantee and must make each write atomic.
//!
//! # Example
//!
//! ```no_run
//! use callslot_core::SlotLockLedger;
//! use callslot_domain::{LockOwner, Result};
//! use chrono::{DateTime, Utc};
//! use uuid::Uuid;
//!
//! async fn reserve(ledger: &dyn SlotLockLedger, blocks: &[DateTime<Utc>], now: DateTime<Utc>) -> Result<Uuid> {
//!     let id = Uuid::now_v7();
//!     ledger.acquire(LockOwner::Booking(id), blocks, None, now).await?;
//!     Ok(id)
//! }
//! ```

use std::collections::HashSet;

use async_trait::async_trait;
use callslot_domain::{LockOwner, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Result of converting a hold into booking locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// Every expected hold row now belongs to the booking.
    Converted,
    /// Fewer live hold rows than expected were found. Nothing was changed.
    Incomplete { found: usize },
}

#[async_trait]
pub trait SlotLockLedger: Send + Sync {
    /// Insert one row per block for `owner`, all or nothing.
    ///
    /// Hold rows carry `expires_at`; booking rows must pass `None`. Expired
    /// hold rows occupying a requested block are reclaimed first. Any block
    /// held by a live lock fails the whole call with
    /// [`CallSlotError::Conflict`](callslot_domain::CallSlotError::Conflict)
    /// and leaves no rows behind.
    async fn acquire(
        &self,
        owner: LockOwner,
        blocks: &[DateTime<Utc>],
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Re-label the live hold rows of `hold_id` as booking rows of
    /// `booking_id`. Applies only if exactly `expected` rows qualify.
    async fn convert(
        &self,
        hold_id: Uuid,
        booking_id: Uuid,
        expected: usize,
        now: DateTime<Utc>,
    ) -> Result<ConversionOutcome>;

    /// Delete every row owned by `owner`. Returns the number removed.
    async fn release(&self, owner: LockOwner) -> Result<usize>;

    /// Block starts in `[from, to)` held by a booking or an unexpired hold.
    async fn locked_blocks(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<HashSet<DateTime<Utc>>>;

    /// Block starts currently owned by `owner`, ascending.
    async fn blocks_owned_by(&self, owner: LockOwner) -> Result<Vec<DateTime<Utc>>>;

    /// Physically delete hold rows expired as of `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}
