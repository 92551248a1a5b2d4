//! Port interfaces for booking and checkout persistence

use async_trait::async_trait;
use callslot_domain::{Booking, BookingStatus, Checkout, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Admin listing filter. Results are sorted by start ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingQuery {
    pub starting_from: Option<DateTime<Utc>>,
    pub status: Option<BookingStatus>,
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a new booking. A second booking for the same
    /// (order id, payment id) pair fails with a conflict.
    async fn insert(&self, booking: &Booking) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>>;

    async fn find_by_payment(&self, order_id: &str, payment_id: &str) -> Result<Option<Booking>>;

    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Booking>>;

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Booking>>;

    async fn list(&self, query: &BookingQuery) -> Result<Vec<Booking>>;

    /// Move a booking from `from` to `to` only if it is still `from`.
    ///
    /// Moving to `cancelled` deletes the booking's slot locks in the same
    /// write. Returns `None` when the id is unknown or the stored status is
    /// no longer `from`.
    async fn transition_status(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Booking>>;
}

#[async_trait]
pub trait CheckoutRepository: Send + Sync {
    async fn insert(&self, checkout: &Checkout) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Checkout>>;

    /// Finalize: status `paid`, payment id, booking link and a fresh
    /// retention deadline.
    async fn mark_paid(
        &self,
        id: Uuid,
        payment_id: &str,
        booking_id: Uuid,
        retain_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Delete checkouts whose retention deadline has passed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}
