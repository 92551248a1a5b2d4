//! Refund requests: customer intake and admin processing

pub mod ports;

use std::collections::BTreeMap;
use std::sync::Arc;

use callslot_domain::constants::{REFUND_LIST_DEFAULT_LIMIT, REFUND_LIST_MAX_LIMIT, REFUND_LIST_MAX_SKIP};
use callslot_domain::{clamp_i64, Booking, CallSlotError, RefundRequest, RefundStatus, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use self::ports::{RefundQuery, RefundRequestRepository};
use crate::booking::ports::BookingRepository;
use crate::clock::Clock;
use crate::payment_ports::{PaymentGateway, ProviderRefund, RefundOrder};
use crate::scheduling::validation::is_valid_email;

/// Raw refund request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundIntake {
    pub name: Option<String>,
    pub email: Option<String>,
    pub reason: Option<String>,
    pub booking_id: Option<String>,
    #[serde(alias = "razorpayOrderId")]
    pub order_id: Option<String>,
    #[serde(alias = "razorpayPaymentId")]
    pub payment_id: Option<String>,
}

fn trimmed(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundPage {
    pub requests: Vec<RefundRequest>,
    pub total: u64,
    pub limit: u32,
    pub skip: u32,
}

/// Refund intake and admin review.
pub struct RefundService {
    bookings: Arc<dyn BookingRepository>,
    refunds: Arc<dyn RefundRequestRepository>,
    gateway: Option<Arc<dyn PaymentGateway>>,
    clock: Arc<dyn Clock>,
}

impl RefundService {
    /// Create a new refund service
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        refunds: Arc<dyn RefundRequestRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { bookings, refunds, gateway: None, clock }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Record a customer refund request.
    ///
    /// The booking is linked (and its payment details copied) only when
    /// the requester's email matches the booking's.
    pub async fn submit(&self, intake: &RefundIntake) -> Result<RefundRequest> {
        let email = trimmed(intake.email.as_ref())
            .filter(|e| is_valid_email(e))
            .map(|e| e.to_lowercase())
            .ok_or_else(|| CallSlotError::Validation("Valid email is required".into()))?;

        let booking_ref = trimmed(intake.booking_id.as_ref());
        let order_id = trimmed(intake.order_id.as_ref());
        let payment_id = trimmed(intake.payment_id.as_ref());
        if booking_ref.is_none() && order_id.is_none() && payment_id.is_none() {
            return Err(CallSlotError::Validation(
                "Provide bookingId, orderId, or paymentId".into(),
            ));
        }

        let booking_id = booking_ref.as_deref().and_then(|id| Uuid::parse_str(id).ok());
        let booking = self
            .lookup_booking(booking_id, payment_id.as_deref(), order_id.as_deref())
            .await?
            .filter(|b| b.email.eq_ignore_ascii_case(&email));

        let now = self.clock.now();
        let request = RefundRequest {
            id: Uuid::now_v7(),
            name: trimmed(intake.name.as_ref()),
            email,
            reason: trimmed(intake.reason.as_ref()),
            booking_id: booking.as_ref().map(|b| b.id),
            provider_order_id: booking.as_ref().and_then(|b| b.provider_order_id.clone()).or(order_id),
            provider_payment_id: booking.as_ref().and_then(|b| b.provider_payment_id.clone()).or(payment_id),
            amount_minor: booking.as_ref().map(|b| b.amount),
            currency: booking.as_ref().map(|b| b.currency.clone()).filter(|c| !c.trim().is_empty()),
            status: RefundStatus::Requested,
            admin_note: None,
            refund_id: None,
            processed_at: None,
            created_at: now,
            updated_at: now,
        };

        self.refunds.insert(&request).await.map_err(|err| {
            if err.is_conflict() {
                CallSlotError::Conflict("Refund request already exists".into())
            } else {
                err
            }
        })?;

        info!(request_id = %request.id, linked = request.booking_id.is_some(), "refund request recorded");
        Ok(request)
    }

    /// Booking by id, else by payment id, else by order id.
    async fn lookup_booking(
        &self,
        booking_id: Option<Uuid>,
        payment_id: Option<&str>,
        order_id: Option<&str>,
    ) -> Result<Option<Booking>> {
        if let Some(id) = booking_id {
            return self.bookings.find_by_id(id).await;
        }
        if let Some(payment_id) = payment_id {
            return self.bookings.find_by_payment_id(payment_id).await;
        }
        if let Some(order_id) = order_id {
            return self.bookings.find_by_order_id(order_id).await;
        }
        Ok(None)
    }

    /// Newest first. `limit` is clamped to 1..=500 (default 100) and
    /// `skip` to 0..=100000.
    pub async fn list(
        &self,
        status: Option<&str>,
        limit: Option<String>,
        skip: Option<String>,
    ) -> Result<RefundPage> {
        let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<RefundStatus>().map_err(CallSlotError::Validation)?),
            None => None,
        };
        let limit = clamp_i64(limit, i64::from(REFUND_LIST_DEFAULT_LIMIT), 1, i64::from(REFUND_LIST_MAX_LIMIT));
        let skip = clamp_i64(skip, 0, 0, i64::from(REFUND_LIST_MAX_SKIP));
        let limit = u32::try_from(limit).unwrap_or(REFUND_LIST_DEFAULT_LIMIT);
        let skip = u32::try_from(skip).unwrap_or(0);

        let (requests, total) = self.refunds.list(&RefundQuery { status, limit, skip }).await?;
        Ok(RefundPage { requests, total, limit, skip })
    }

    async fn open_request(&self, id: Uuid) -> Result<RefundRequest> {
        let request = self
            .refunds
            .find_by_id(id)
            .await?
            .ok_or_else(|| CallSlotError::NotFound("Refund request not found".into()))?;
        if !request.is_open() {
            return Err(CallSlotError::Validation(format!("Refund request is {}", request.status)));
        }
        Ok(request)
    }

    /// Issue the refund with the provider and record the result.
    ///
    /// The request is claimed (`requested` to `processing`) before the
    /// provider is called, so a concurrent approval or rejection loses with a
    /// conflict instead of issuing a second refund. A provider failure marks
    /// the request `failed` with the error as the admin note, then surfaces
    /// the error.
    pub async fn approve(&self, id: Uuid) -> Result<(RefundRequest, ProviderRefund)> {
        let gateway = self
            .gateway
            .as_ref()
            .ok_or_else(|| CallSlotError::ProviderUnavailable("Razorpay is not configured.".into()))?;
        let mut request = self.open_request(id).await?;

        let booking = self
            .lookup_booking(
                request.booking_id,
                request.provider_payment_id.as_deref(),
                request.provider_order_id.as_deref(),
            )
            .await?;

        let payment_id = booking
            .as_ref()
            .and_then(|b| b.provider_payment_id.clone())
            .or_else(|| request.provider_payment_id.clone())
            .ok_or_else(|| CallSlotError::Validation("Missing payment id".into()))?;
        let amount = booking.as_ref().map(|b| b.amount).or(request.amount_minor).unwrap_or(0);
        if amount <= 0 {
            return Err(CallSlotError::Validation("Invalid refund amount".into()));
        }
        let currency = booking
            .as_ref()
            .map(|b| b.currency.trim().to_string())
            .filter(|c| !c.is_empty())
            .or_else(|| request.currency.clone());

        request.status = RefundStatus::Processing;
        request.updated_at = self.clock.now();
        if !self.refunds.transition(&request, RefundStatus::Requested).await? {
            info!(request_id = %request.id, "refund request claimed by another admin");
            return Err(already_handled());
        }

        let notes = BTreeMap::from([
            ("email".to_string(), request.email.clone()),
            ("kind".to_string(), "call".to_string()),
            (
                "bookingId".to_string(),
                booking.as_ref().map(|b| b.id).or(request.booking_id).map(|id| id.to_string()).unwrap_or_default(),
            ),
            ("requestId".to_string(), request.id.to_string()),
        ]);

        let result = gateway.create_refund(RefundOrder { payment_id, amount, notes }).await;
        let now = self.clock.now();
        request.processed_at = Some(now);
        request.updated_at = now;

        match result {
            Ok(refund) => {
                request.status = RefundStatus::Refunded;
                request.refund_id = Some(refund.id.clone());
                request.amount_minor = Some(amount);
                request.currency = currency;
                if !self.refunds.transition(&request, RefundStatus::Processing).await? {
                    error!(request_id = %request.id, refund_id = %refund.id, "refund issued but request left processing");
                }
                info!(request_id = %request.id, refund_id = %refund.id, amount, "refund issued");
                Ok((request, refund))
            }
            Err(err) => {
                request.status = RefundStatus::Failed;
                request.admin_note = Some(err.to_string());
                match self.refunds.transition(&request, RefundStatus::Processing).await {
                    Ok(true) => {}
                    Ok(false) => error!(request_id = %request.id, "refund failure not recorded: request left processing"),
                    Err(update_err) => {
                        error!(request_id = %request.id, error = %update_err, "failed to record refund failure");
                    }
                }
                warn!(request_id = %request.id, error = %err, "refund failed");
                Err(err)
            }
        }
    }

    /// Close a `requested` request without refunding.
    pub async fn reject(&self, id: Uuid, note: Option<String>) -> Result<RefundRequest> {
        let mut request = self.open_request(id).await?;
        let now = self.clock.now();
        request.status = RefundStatus::Rejected;
        request.admin_note = trimmed(note.as_ref());
        request.processed_at = Some(now);
        request.updated_at = now;
        if !self.refunds.transition(&request, RefundStatus::Requested).await? {
            return Err(already_handled());
        }
        info!(request_id = %request.id, "refund request rejected");
        Ok(request)
    }
}

fn already_handled() -> CallSlotError {
    CallSlotError::Conflict("Refund request is already being processed".into())
}
