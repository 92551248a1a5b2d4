//! Checkout orchestration: hold, provider order, verification
//!
//! ```text
//! initiate:  validate -> hold locks -> provider order -> checkout row (created)
//! verify:    signature -> provider payment lookup -> convert hold to booking
//!            locks (or re-acquire) -> booking row -> checkout paid
//! ```
//!
//! A payment that is captured after its slot was lost still produces a
//! booking, marked `cancelled` and `paid`, so the money can be reconciled.

use std::collections::BTreeMap;
use std::sync::Arc;

use callslot_domain::constants::{
    CHECKOUT_RETENTION_DAYS, MSG_PAID_SLOT_GONE, MSG_PAID_SLOT_UNCONFIRMED, ORDER_RECEIPT_PREFIX,
    PAYMENT_PROVIDER_RAZORPAY,
};
use callslot_domain::{
    Booking, BookingStatus, CallSlotError, Checkout, CheckoutSession, CheckoutStatus, LockOwner,
    PaymentProof, PaymentStatus, Result, SchedulingConfig, VerifiedCheckout,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::ports::{BookingRepository, CheckoutRepository};
use crate::clock::Clock;
use crate::ledger_ports::{ConversionOutcome, SlotLockLedger};
use crate::notifications::NotificationDispatcher;
use crate::payment_ports::{OrderRequest, PaymentGateway};
use crate::scheduling::window::block_starts;
use crate::scheduling::{validate_booking, BookingCandidate, BookingRequest, ValidationOutcome};

/// Raw verification body. Accepts both generic and provider-prefixed keys.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub checkout_id: Option<String>,
    #[serde(alias = "razorpayOrderId")]
    pub order_id: Option<String>,
    #[serde(alias = "razorpayPaymentId")]
    pub payment_id: Option<String>,
    #[serde(alias = "razorpaySignature")]
    pub signature: Option<String>,
}

fn required(value: Option<&str>, field: &str) -> Result<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CallSlotError::Validation(format!("{field} is required")))
}

impl VerifyRequest {
    /// Check presence of every field. An unparseable checkout id is reported
    /// as an unknown checkout.
    pub fn into_proof(self) -> Result<PaymentProof> {
        let checkout_id = required(self.checkout_id.as_deref(), "checkoutId")?;
        let order_id = required(self.order_id.as_deref(), "orderId")?;
        let payment_id = required(self.payment_id.as_deref(), "paymentId")?;
        let signature = required(self.signature.as_deref(), "signature")?;
        let checkout_id =
            Uuid::parse_str(&checkout_id).map_err(|_| CallSlotError::NotFound("Checkout not found".into()))?;
        Ok(PaymentProof { checkout_id, order_id, payment_id, signature })
    }
}

/// How the booking's blocks ended up after verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Materialized {
    Locked,
    Lost,
}

/// Paid booking flow: hold the slot, open an order, verify and convert.
pub struct CheckoutService {
    config: Arc<SchedulingConfig>,
    ledger: Arc<dyn SlotLockLedger>,
    bookings: Arc<dyn BookingRepository>,
    checkouts: Arc<dyn CheckoutRepository>,
    gateway: Option<Arc<dyn PaymentGateway>>,
    notifier: NotificationDispatcher,
    clock: Arc<dyn Clock>,
}

impl CheckoutService {
    /// Create a new checkout service
    pub fn new(
        config: Arc<SchedulingConfig>,
        ledger: Arc<dyn SlotLockLedger>,
        bookings: Arc<dyn BookingRepository>,
        checkouts: Arc<dyn CheckoutRepository>,
        notifier: NotificationDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { config, ledger, bookings, checkouts, gateway: None, notifier, clock }
    }

    /// Attach the payment provider. Without one, checkout answers
    /// "provider unavailable".
    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    fn gateway(&self) -> Result<&Arc<dyn PaymentGateway>> {
        self.gateway
            .as_ref()
            .ok_or_else(|| CallSlotError::ProviderUnavailable("Razorpay is not configured.".into()))
    }

    fn retention_deadline(now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(CHECKOUT_RETENTION_DAYS)
    }

    /// Validate, take a hold on the blocks and open a provider order.
    ///
    /// A conflicting hold or booking aborts before the provider is
    /// contacted. Any failure after the hold is taken releases it.
    pub async fn initiate(&self, request: &BookingRequest) -> Result<CheckoutSession> {
        let now = self.clock.now();
        let candidate = match validate_booking(request, &self.config, now) {
            ValidationOutcome::Valid(candidate) => candidate,
            ValidationOutcome::Invalid(failure) => return Err(failure.into()),
        };

        if !self.config.require_payment {
            return Err(CallSlotError::Validation("Payments are disabled.".into()));
        }
        let gateway = Arc::clone(self.gateway()?);

        let amount = self.config.price_for(candidate.duration_minutes).unwrap_or(0);
        if amount <= 0 {
            return Err(CallSlotError::Validation("Invalid call price configuration.".into()));
        }

        let checkout_id = Uuid::now_v7();
        let hold = LockOwner::Hold(checkout_id);
        let hold_expires_at = now + Duration::minutes(i64::from(self.config.hold_minutes));

        if let Err(err) = self.ledger.acquire(hold, &candidate.blocks, Some(hold_expires_at), now).await {
            if err.is_conflict() {
                info!(start_at = %candidate.start_at, "checkout hold lost slot race");
            }
            return Err(err);
        }

        match self
            .open_order(gateway.as_ref(), checkout_id, &candidate, amount, hold_expires_at, now)
            .await
        {
            Ok(session) => {
                info!(
                    %checkout_id,
                    order_id = %session.order_id,
                    hold_expires_at = %hold_expires_at,
                    "checkout created"
                );
                Ok(session)
            }
            Err(err) => {
                warn!(%checkout_id, error = %err, "checkout creation failed, releasing hold");
                if let Err(release_err) = self.ledger.release(hold).await {
                    error!(%checkout_id, error = %release_err, "failed to release hold");
                }
                Err(err)
            }
        }
    }

    async fn open_order(
        &self,
        gateway: &dyn PaymentGateway,
        checkout_id: Uuid,
        candidate: &BookingCandidate,
        amount: i64,
        hold_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<CheckoutSession> {
        let currency = self.config.currency.clone();
        let notes = BTreeMap::from([
            ("startAt".to_string(), candidate.start_at.to_rfc3339()),
            ("durationMinutes".to_string(), candidate.duration_minutes.to_string()),
            ("topic".to_string(), candidate.topic.clone()),
        ]);
        let order = gateway
            .create_order(OrderRequest {
                amount,
                currency: currency.clone(),
                receipt: format!("{ORDER_RECEIPT_PREFIX}{checkout_id}"),
                notes,
            })
            .await?;

        let checkout = Checkout {
            id: checkout_id,
            start_at: candidate.start_at,
            duration_minutes: candidate.duration_minutes,
            name: candidate.name.clone(),
            email: candidate.email.clone(),
            topic: candidate.topic.clone(),
            title: candidate.title.clone(),
            amount,
            currency: currency.clone(),
            provider_order_id: order.id.clone(),
            provider_payment_id: None,
            booking_id: None,
            status: CheckoutStatus::Created,
            hold_expires_at,
            expires_at: Self::retention_deadline(now),
            created_at: now,
            updated_at: now,
        };
        self.checkouts.insert(&checkout).await?;

        Ok(CheckoutSession {
            checkout_id,
            hold_expires_at,
            key_id: gateway.key_id().to_string(),
            order_id: order.id,
            amount,
            currency,
            time_zone: self.config.time_zone.name().to_string(),
        })
    }

    /// Turn a paid checkout into a booking. Safe to call repeatedly with
    /// the same proof.
    pub async fn verify(&self, proof: &PaymentProof) -> Result<VerifiedCheckout> {
        let checkout = self
            .checkouts
            .find_by_id(proof.checkout_id)
            .await?
            .ok_or_else(|| CallSlotError::NotFound("Checkout not found".into()))?;

        if let Some(booking_id) = checkout.paid_booking_id() {
            let booking = self.find_booking(booking_id).await?;
            return Ok(VerifiedCheckout { booking, message: None });
        }

        let gateway = Arc::clone(self.gateway()?);
        self.verify_payment(gateway.as_ref(), &checkout, proof).await?;

        let now = self.clock.now();
        if let Some(existing) = self.bookings.find_by_payment(&proof.order_id, &proof.payment_id).await? {
            info!(checkout_id = %checkout.id, booking_id = %existing.id, "payment already materialized");
            self.checkouts
                .mark_paid(checkout.id, &proof.payment_id, existing.id, Self::retention_deadline(now), now)
                .await?;
            return Ok(VerifiedCheckout { booking: existing, message: None });
        }

        let blocks = block_starts(checkout.start_at, checkout.duration_minutes, self.config.step_minutes);
        if blocks.is_empty() {
            return Err(CallSlotError::Validation("Invalid slot duration".into()));
        }

        let hold_expired = checkout.is_hold_expired(now);
        // One checkout yields at most one booking: the booking reuses its id.
        let booking_id = checkout.id;
        let outcome = self.materialize(checkout.id, booking_id, &blocks, now).await?;

        let booking = Booking {
            id: booking_id,
            start_at: checkout.start_at,
            duration_minutes: checkout.duration_minutes,
            name: checkout.name.clone(),
            email: checkout.email.clone(),
            topic: checkout.topic.clone(),
            title: checkout.title.clone(),
            status: match outcome {
                Materialized::Locked => BookingStatus::Scheduled,
                Materialized::Lost => BookingStatus::Cancelled,
            },
            payment_provider: Some(PAYMENT_PROVIDER_RAZORPAY.to_string()),
            payment_status: PaymentStatus::Paid,
            amount: checkout.amount,
            currency: checkout.currency.clone(),
            provider_order_id: Some(checkout.provider_order_id.clone()),
            provider_payment_id: Some(proof.payment_id.clone()),
            paid_at: Some(now),
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.bookings.insert(&booking).await {
            // A concurrent verify with the same proof may have won the insert.
            if let Some(existing) = self.bookings.find_by_payment(&proof.order_id, &proof.payment_id).await? {
                if existing.id != booking_id && outcome == Materialized::Locked {
                    self.release_booking_locks(booking_id).await;
                }
                self.checkouts
                    .mark_paid(checkout.id, &proof.payment_id, existing.id, Self::retention_deadline(now), now)
                    .await?;
                return Ok(VerifiedCheckout { booking: existing, message: None });
            }
            if outcome == Materialized::Locked {
                self.release_booking_locks(booking_id).await;
            }
            return Err(err);
        }

        self.checkouts
            .mark_paid(checkout.id, &proof.payment_id, booking.id, Self::retention_deadline(now), now)
            .await?;

        self.notifier.notify_booking(&booking, "call_booking_paid");

        let message = match outcome {
            Materialized::Locked => {
                info!(checkout_id = %checkout.id, booking_id = %booking.id, "paid booking confirmed");
                None
            }
            Materialized::Lost => {
                warn!(
                    checkout_id = %checkout.id,
                    booking_id = %booking.id,
                    hold_expired,
                    "payment captured but slot lost"
                );
                let message = if hold_expired { MSG_PAID_SLOT_GONE } else { MSG_PAID_SLOT_UNCONFIRMED };
                Some(message.to_string())
            }
        };
        Ok(VerifiedCheckout { booking, message })
    }

    async fn release_booking_locks(&self, booking_id: Uuid) {
        if let Err(err) = self.ledger.release(LockOwner::Booking(booking_id)).await {
            error!(%booking_id, error = %err, "failed to release booking locks");
        }
    }

    async fn find_booking(&self, id: Uuid) -> Result<Booking> {
        self.bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| CallSlotError::NotFound("Booking not found".into()))
    }

    /// Signature, then a direct provider lookup: client-supplied fields are
    /// never trusted on their own.
    async fn verify_payment(
        &self,
        gateway: &dyn PaymentGateway,
        checkout: &Checkout,
        proof: &PaymentProof,
    ) -> Result<()> {
        if checkout.provider_order_id != proof.order_id {
            return Err(CallSlotError::PaymentIntegrity("Order mismatch".into()));
        }
        if !gateway.verify_signature(&proof.order_id, &proof.payment_id, &proof.signature) {
            warn!(checkout_id = %checkout.id, "invalid payment signature");
            return Err(CallSlotError::PaymentIntegrity("Invalid payment signature".into()));
        }

        let payment = gateway.fetch_payment(&proof.payment_id).await?;
        if payment.order_id.as_deref().is_some_and(|id| id != proof.order_id) {
            warn!(checkout_id = %checkout.id, payment_id = %payment.id, "payment belongs to another order");
            return Err(CallSlotError::PaymentIntegrity("Payment/order mismatch".into()));
        }
        if payment.amount != checkout.amount || payment.currency != checkout.currency {
            warn!(
                checkout_id = %checkout.id,
                expected = checkout.amount,
                actual = payment.amount,
                "payment amount mismatch"
            );
            return Err(CallSlotError::PaymentIntegrity("Payment amount mismatch".into()));
        }
        if !payment.is_captured() {
            return Err(CallSlotError::PaymentIntegrity(format!(
                "Payment is not captured (status: {})",
                payment.status
            )));
        }
        Ok(())
    }

    /// Convert the hold into booking locks; if the hold no longer covers
    /// every block, drop what is left of it and lock the blocks directly.
    async fn materialize(
        &self,
        checkout_id: Uuid,
        booking_id: Uuid,
        blocks: &[DateTime<Utc>],
        now: DateTime<Utc>,
    ) -> Result<Materialized> {
        match self.ledger.convert(checkout_id, booking_id, blocks.len(), now).await? {
            ConversionOutcome::Converted => return Ok(Materialized::Locked),
            ConversionOutcome::Incomplete { found } => {
                info!(%checkout_id, found, expected = blocks.len(), "hold incomplete, locking directly");
            }
        }

        let owner = LockOwner::Booking(booking_id);
        self.ledger.release(LockOwner::Hold(checkout_id)).await?;
        match self.ledger.acquire(owner, blocks, None, now).await {
            Ok(()) => Ok(Materialized::Locked),
            Err(err) if err.is_conflict() => {
                // A concurrent verify of this checkout may already own the blocks.
                if self.ledger.blocks_owned_by(owner).await? == blocks {
                    Ok(Materialized::Locked)
                } else {
                    Ok(Materialized::Lost)
                }
            }
            Err(err) => Err(err),
        }
    }
}
