//! Shared test helpers for `callslot-core` integration tests.
//!
//! In-memory fakes for every port plus a settable clock, so service tests
//! can focus on behaviour instead of storage.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use callslot_core::{
    BookingQuery, BookingRepository, CheckoutRepository, Clock, ConversionOutcome, EmailMessage,
    Mailer, NotificationDispatcher, OrderRequest, PaymentGateway, PaymentRecord, ProviderOrder,
    ProviderRefund, RefundOrder, RefundQuery, RefundRequestRepository, SlotLockLedger,
};
use callslot_domain::{
    resolve_scheduling_config, Booking, BookingStatus, CallSlotError, Checkout, CheckoutStatus,
    LockKind, LockOwner, RefundRequest, RefundStatus, Result, SchedulingConfig,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

pub fn utc(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, minute, 0).single().expect("valid instant")
}

pub fn config(pairs: &[(&str, &str)]) -> SchedulingConfig {
    let pairs: Vec<(String, String)> =
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
    resolve_scheduling_config(|key| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()))
}

// ============================================================================
// Clock
// ============================================================================

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self { now: Mutex::new(now) })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

// ============================================================================
// Ledger
// ============================================================================

#[derive(Debug, Clone)]
struct LockRow {
    owner: LockOwner,
    expires_at: Option<DateTime<Utc>>,
}

impl LockRow {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        match self.owner.kind() {
            LockKind::Booking => true,
            LockKind::Hold => self.expires_at.is_some_and(|at| at > now),
        }
    }
}

/// Ledger keyed by block start; one mutex guards each operation so every
/// call is atomic, like a single database transaction.
#[derive(Default)]
pub struct InMemoryLedger {
    rows: Mutex<BTreeMap<DateTime<Utc>, LockRow>>,
}

impl InMemoryLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().expect("ledger lock").len()
    }

    /// Force a lock in place, bypassing conflict checks.
    pub fn insert_raw(&self, block: DateTime<Utc>, owner: LockOwner, expires_at: Option<DateTime<Utc>>) {
        self.rows.lock().expect("ledger lock").insert(block, LockRow { owner, expires_at });
    }
}

#[async_trait]
impl SlotLockLedger for InMemoryLedger {
    async fn acquire(
        &self,
        owner: LockOwner,
        blocks: &[DateTime<Utc>],
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut rows = self.rows.lock().expect("ledger lock");
        if blocks.iter().any(|b| rows.get(b).is_some_and(|row| row.is_live(now))) {
            return Err(CallSlotError::slot_taken());
        }
        for block in blocks {
            rows.insert(*block, LockRow { owner, expires_at });
        }
        Ok(())
    }

    async fn convert(
        &self,
        hold_id: Uuid,
        booking_id: Uuid,
        expected: usize,
        now: DateTime<Utc>,
    ) -> Result<ConversionOutcome> {
        let mut rows = self.rows.lock().expect("ledger lock");
        let hold = LockOwner::Hold(hold_id);
        let keys: Vec<_> = rows
            .iter()
            .filter(|(_, row)| row.owner == hold && row.is_live(now))
            .map(|(k, _)| *k)
            .collect();
        if keys.len() != expected {
            return Ok(ConversionOutcome::Incomplete { found: keys.len() });
        }
        for key in keys {
            rows.insert(key, LockRow { owner: LockOwner::Booking(booking_id), expires_at: None });
        }
        Ok(ConversionOutcome::Converted)
    }

    async fn release(&self, owner: LockOwner) -> Result<usize> {
        let mut rows = self.rows.lock().expect("ledger lock");
        let before = rows.len();
        rows.retain(|_, row| row.owner != owner);
        Ok(before - rows.len())
    }

    async fn locked_blocks(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<HashSet<DateTime<Utc>>> {
        let rows = self.rows.lock().expect("ledger lock");
        Ok(rows.range(from..to).filter(|(_, row)| row.is_live(now)).map(|(k, _)| *k).collect())
    }

    async fn blocks_owned_by(&self, owner: LockOwner) -> Result<Vec<DateTime<Utc>>> {
        let rows = self.rows.lock().expect("ledger lock");
        Ok(rows.iter().filter(|(_, row)| row.owner == owner).map(|(k, _)| *k).collect())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut rows = self.rows.lock().expect("ledger lock");
        let before = rows.len();
        rows.retain(|_, row| row.is_live(now));
        Ok(before - rows.len())
    }
}

// ============================================================================
// Repositories
// ============================================================================

/// Bookings table. When linked to a ledger, cancelling drops the booking's
/// locks under the same call, like the shared SQLite transaction.
#[derive(Default)]
pub struct InMemoryBookings {
    rows: Mutex<Vec<Booking>>,
    ledger: Option<Arc<InMemoryLedger>>,
    pub fail_inserts: std::sync::atomic::AtomicBool,
}

impl InMemoryBookings {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn linked(ledger: Arc<InMemoryLedger>) -> Arc<Self> {
        Arc::new(Self { ledger: Some(ledger), ..Self::default() })
    }

    pub fn all(&self) -> Vec<Booking> {
        self.rows.lock().expect("bookings lock").clone()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookings {
    async fn insert(&self, booking: &Booking) -> Result<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(CallSlotError::Database("disk full".into()));
        }
        let mut rows = self.rows.lock().expect("bookings lock");
        let duplicate = booking.provider_order_id.is_some()
            && rows.iter().any(|b| {
                b.provider_order_id == booking.provider_order_id
                    && b.provider_payment_id == booking.provider_payment_id
            });
        if duplicate {
            return Err(CallSlotError::Conflict("Duplicate payment".into()));
        }
        rows.push(booking.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        Ok(self.rows.lock().expect("bookings lock").iter().find(|b| b.id == id).cloned())
    }

    async fn find_by_payment(&self, order_id: &str, payment_id: &str) -> Result<Option<Booking>> {
        Ok(self
            .rows
            .lock()
            .expect("bookings lock")
            .iter()
            .find(|b| {
                b.provider_order_id.as_deref() == Some(order_id)
                    && b.provider_payment_id.as_deref() == Some(payment_id)
            })
            .cloned())
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Booking>> {
        Ok(self
            .rows
            .lock()
            .expect("bookings lock")
            .iter()
            .find(|b| b.provider_payment_id.as_deref() == Some(payment_id))
            .cloned())
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Booking>> {
        Ok(self
            .rows
            .lock()
            .expect("bookings lock")
            .iter()
            .find(|b| b.provider_order_id.as_deref() == Some(order_id))
            .cloned())
    }

    async fn list(&self, query: &BookingQuery) -> Result<Vec<Booking>> {
        let mut found: Vec<Booking> = self
            .rows
            .lock()
            .expect("bookings lock")
            .iter()
            .filter(|b| query.starting_from.map_or(true, |from| b.start_at >= from))
            .filter(|b| query.status.map_or(true, |s| b.status == s))
            .cloned()
            .collect();
        found.sort_by_key(|b| b.start_at);
        Ok(found)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Booking>> {
        let mut rows = self.rows.lock().expect("bookings lock");
        let Some(booking) = rows.iter_mut().find(|b| b.id == id && b.status == from) else {
            return Ok(None);
        };
        if to == BookingStatus::Cancelled {
            if let Some(ledger) = &self.ledger {
                ledger.rows.lock().expect("ledger lock").retain(|_, row| row.owner != LockOwner::Booking(id));
            }
        }
        booking.status = to;
        booking.updated_at = updated_at;
        Ok(Some(booking.clone()))
    }
}

#[derive(Default)]
pub struct InMemoryCheckouts {
    rows: Mutex<Vec<Checkout>>,
}

impl InMemoryCheckouts {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn all(&self) -> Vec<Checkout> {
        self.rows.lock().expect("checkouts lock").clone()
    }
}

#[async_trait]
impl CheckoutRepository for InMemoryCheckouts {
    async fn insert(&self, checkout: &Checkout) -> Result<()> {
        self.rows.lock().expect("checkouts lock").push(checkout.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Checkout>> {
        Ok(self.rows.lock().expect("checkouts lock").iter().find(|c| c.id == id).cloned())
    }

    async fn mark_paid(
        &self,
        id: Uuid,
        payment_id: &str,
        booking_id: Uuid,
        retain_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut rows = self.rows.lock().expect("checkouts lock");
        let checkout = rows
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CallSlotError::NotFound("Checkout not found".into()))?;
        checkout.status = CheckoutStatus::Paid;
        checkout.provider_payment_id = Some(payment_id.to_string());
        checkout.booking_id = Some(booking_id);
        checkout.expires_at = retain_until;
        checkout.updated_at = now;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut rows = self.rows.lock().expect("checkouts lock");
        let before = rows.len();
        rows.retain(|c| c.expires_at > now);
        Ok(before - rows.len())
    }
}

#[derive(Default)]
pub struct InMemoryRefunds {
    rows: Mutex<Vec<RefundRequest>>,
}

impl InMemoryRefunds {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl RefundRequestRepository for InMemoryRefunds {
    async fn insert(&self, request: &RefundRequest) -> Result<()> {
        let mut rows = self.rows.lock().expect("refunds lock");
        if request.provider_payment_id.is_some()
            && rows.iter().any(|r| r.provider_payment_id == request.provider_payment_id)
        {
            return Err(CallSlotError::Conflict("duplicate payment id".into()));
        }
        rows.push(request.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefundRequest>> {
        Ok(self.rows.lock().expect("refunds lock").iter().find(|r| r.id == id).cloned())
    }

    async fn transition(&self, request: &RefundRequest, from: RefundStatus) -> Result<bool> {
        let mut rows = self.rows.lock().expect("refunds lock");
        match rows.iter_mut().find(|r| r.id == request.id && r.status == from) {
            Some(row) => {
                *row = request.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self, query: &RefundQuery) -> Result<(Vec<RefundRequest>, u64)> {
        let rows = self.rows.lock().expect("refunds lock");
        let mut matching: Vec<RefundRequest> =
            rows.iter().filter(|r| query.status.map_or(true, |s| r.status == s)).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as u64;
        let page = matching.into_iter().skip(query.skip as usize).take(query.limit as usize).collect();
        Ok((page, total))
    }
}

// ============================================================================
// Payment gateway
// ============================================================================

/// Provider fake. Signatures are valid when equal to `sig:<order>|<payment>`.
pub struct FakeGateway {
    pub orders_created: AtomicUsize,
    pub refunds_created: AtomicUsize,
    payment: Mutex<Option<PaymentRecord>>,
    pub fail_refunds: std::sync::atomic::AtomicBool,
    /// Milliseconds `create_refund` waits before answering.
    pub refund_delay_ms: AtomicU64,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            orders_created: AtomicUsize::new(0),
            refunds_created: AtomicUsize::new(0),
            payment: Mutex::new(None),
            fail_refunds: std::sync::atomic::AtomicBool::new(false),
            refund_delay_ms: AtomicU64::new(0),
        })
    }

    pub fn signature(order_id: &str, payment_id: &str) -> String {
        format!("sig:{order_id}|{payment_id}")
    }

    /// Payment returned by `fetch_payment`.
    pub fn set_payment(&self, payment: PaymentRecord) {
        *self.payment.lock().expect("payment lock") = Some(payment);
    }

    pub fn orders(&self) -> usize {
        self.orders_created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn key_id(&self) -> &str {
        "rzp_test_key"
    }

    async fn create_order(&self, request: OrderRequest) -> Result<ProviderOrder> {
        let n = self.orders_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ProviderOrder {
            id: format!("order_{n}"),
            amount: request.amount,
            currency: request.currency,
            status: "created".into(),
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        signature == Self::signature(order_id, payment_id)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord> {
        self.payment
            .lock()
            .expect("payment lock")
            .clone()
            .filter(|p| p.id == payment_id)
            .ok_or_else(|| CallSlotError::Network("payment not found".into()))
    }

    async fn create_refund(&self, refund: RefundOrder) -> Result<ProviderRefund> {
        let delay = self.refund_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        if self.fail_refunds.load(Ordering::SeqCst) {
            return Err(CallSlotError::Network("The amount must be at least INR 1.00".into()));
        }
        let n = self.refunds_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ProviderRefund { id: format!("rfnd_{n}"), amount: refund.amount, status: "processed".into() })
    }
}

pub fn captured(payment_id: &str, order_id: &str, amount: i64) -> PaymentRecord {
    PaymentRecord {
        id: payment_id.to_string(),
        order_id: Some(order_id.to_string()),
        amount,
        currency: "INR".into(),
        status: "captured".into(),
        captured: true,
    }
}

// ============================================================================
// Mailer
// ============================================================================

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    pub fail: std::sync::atomic::AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("mailer lock").clone()
    }

    /// Wait for background sends to land.
    pub async fn wait_for(&self, count: usize) -> Vec<EmailMessage> {
        for _ in 0..100 {
            if self.sent.lock().expect("mailer lock").len() >= count {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        self.sent()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CallSlotError::Network("smtp down".into()));
        }
        self.sent.lock().expect("mailer lock").push(message);
        Ok(())
    }
}

pub fn dispatcher(mailer: Arc<RecordingMailer>, config: &SchedulingConfig) -> NotificationDispatcher {
    NotificationDispatcher::new(mailer, config.time_zone)
        .with_admin_recipients(vec!["owner@example.com".into()])
        .with_subject_prefix("Portfolio")
}
