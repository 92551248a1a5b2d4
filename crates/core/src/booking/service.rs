//! Free-booking path and admin status transitions

use std::sync::Arc;

use callslot_domain::constants::UPCOMING_GRACE_MINUTES;
use callslot_domain::{
    Booking, BookingListing, BookingStatus, BookingView, CallSlotError, LockOwner, PaymentStatus,
    Result, SchedulingConfig,
};
use chrono::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::ports::{BookingQuery, BookingRepository};
use crate::clock::Clock;
use crate::ledger_ports::SlotLockLedger;
use crate::notifications::NotificationDispatcher;
use crate::scheduling::{validate_booking, BookingRequest, ValidationOutcome};

/// Free bookings and admin status changes.
pub struct BookingService {
    config: Arc<SchedulingConfig>,
    ledger: Arc<dyn SlotLockLedger>,
    bookings: Arc<dyn BookingRepository>,
    notifier: NotificationDispatcher,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    /// Create a new booking service
    pub fn new(
        config: Arc<SchedulingConfig>,
        ledger: Arc<dyn SlotLockLedger>,
        bookings: Arc<dyn BookingRepository>,
        notifier: NotificationDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { config, ledger, bookings, notifier, clock }
    }

    /// Book without payment: validate, lock the blocks directly, persist.
    ///
    /// A lock conflict is returned as-is and no booking row is written.
    pub async fn book_free(&self, request: &BookingRequest) -> Result<Booking> {
        let now = self.clock.now();
        let candidate = match validate_booking(request, &self.config, now) {
            ValidationOutcome::Valid(candidate) => candidate,
            ValidationOutcome::Invalid(failure) => return Err(failure.into()),
        };

        if self.config.require_payment {
            return Err(CallSlotError::PaymentRequired("Payment required. Use /calls/checkout.".into()));
        }

        let booking_id = Uuid::now_v7();
        let owner = LockOwner::Booking(booking_id);
        if let Err(err) = self.ledger.acquire(owner, &candidate.blocks, None, now).await {
            if err.is_conflict() {
                info!(start_at = %candidate.start_at, "free booking lost slot race");
            }
            return Err(err);
        }

        let booking = Booking {
            id: booking_id,
            start_at: candidate.start_at,
            duration_minutes: candidate.duration_minutes,
            name: candidate.name,
            email: candidate.email,
            topic: candidate.topic,
            title: candidate.title,
            status: BookingStatus::Scheduled,
            payment_provider: None,
            payment_status: PaymentStatus::Paid,
            amount: 0,
            currency: self.config.currency.clone(),
            provider_order_id: None,
            provider_payment_id: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.bookings.insert(&booking).await {
            self.release_quietly(owner).await;
            return Err(err);
        }

        info!(booking_id = %booking.id, start_at = %booking.start_at, blocks = candidate.blocks.len(), "free booking created");
        self.notifier.notify_booking(&booking, "call_booking_free");
        Ok(booking)
    }

    /// Admin listing. `Upcoming` also shows calls that started within the
    /// last hour.
    pub async fn list_bookings(&self, view: BookingView, status: Option<BookingStatus>) -> Result<BookingListing> {
        let starting_from = match view {
            BookingView::Upcoming => Some(self.clock.now() - Duration::minutes(UPCOMING_GRACE_MINUTES)),
            BookingView::All => None,
        };
        let bookings = self.bookings.list(&BookingQuery { starting_from, status }).await?;
        Ok(BookingListing { time_zone: self.config.time_zone.name().to_string(), bookings })
    }

    /// Admin transition. Only `scheduled` bookings move, and the write is
    /// conditional on the status read here, so racing transitions have one
    /// winner. Cancelling frees the slot in the same write.
    pub async fn update_status(&self, id: Uuid, next: BookingStatus) -> Result<Booking> {
        let current = self
            .bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| CallSlotError::NotFound("Booking not found".into()))?;

        if !current.status.can_transition_to(next) {
            return Err(CallSlotError::Validation(format!(
                "Cannot change a {} booking to {}",
                current.status, next
            )));
        }

        let Some(updated) = self.bookings.transition_status(id, current.status, next, self.clock.now()).await? else {
            warn!(booking_id = %id, to = %next, "booking status changed concurrently");
            return Err(CallSlotError::Conflict("Booking was updated by another request".into()));
        };
        info!(booking_id = %id, from = %current.status, to = %next, "booking status updated");
        Ok(updated)
    }

    async fn release_quietly(&self, owner: LockOwner) {
        match self.ledger.release(owner).await {
            Ok(released) => warn!(%owner, released, "rolled back locks after failed booking insert"),
            Err(err) => error!(%owner, error = %err, "failed to roll back locks"),
        }
    }
}
