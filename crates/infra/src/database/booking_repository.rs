//! SQLite-backed booking and checkout repositories.

use std::sync::Arc;

use async_trait::async_trait;
use callslot_core::{BookingQuery, BookingRepository, CheckoutRepository};
use callslot_domain::{Booking, BookingStatus, Checkout, CheckoutStatus, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use super::manager::DbManager;
use super::rows::{id, instant, minutes, opt_id, opt_instant, opt_unix, status, unix};
use crate::errors::InfraError;

const BOOKING_COLUMNS: &str = "id, start_at, duration_minutes, name, email, topic, title, status,
    payment_provider, payment_status, amount, currency, provider_order_id, provider_payment_id,
    paid_at, created_at, updated_at";

/// Bookings stored in the `bookings` table.
pub struct SqliteBookingRepository {
    db: Arc<DbManager>,
}

impl SqliteBookingRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn find_one(&self, clause: &'static str, args: Vec<String>) -> Result<Option<Booking>> {
        self.db
            .run(move |conn| {
                let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE {clause} ORDER BY created_at DESC LIMIT 1");
                let booking =
                    conn.query_row(&sql, params_from_iter(args.iter()), map_booking).optional()?;
                Ok(booking)
            })
            .await
    }
}

fn map_booking(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: id(row, 0)?,
        start_at: instant(row, 1)?,
        duration_minutes: minutes(row, 2)?,
        name: row.get(3)?,
        email: row.get(4)?,
        topic: row.get(5)?,
        title: row.get(6)?,
        status: status(row, 7)?,
        payment_provider: row.get(8)?,
        payment_status: status(row, 9)?,
        amount: row.get(10)?,
        currency: row.get(11)?,
        provider_order_id: row.get(12)?,
        provider_payment_id: row.get(13)?,
        paid_at: opt_instant(row, 14)?,
        created_at: instant(row, 15)?,
        updated_at: instant(row, 16)?,
    })
}

fn select_booking(conn: &Connection, id: &str) -> std::result::Result<Option<Booking>, InfraError> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], map_booking).optional()?)
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<()> {
        let b = booking.clone();
        self.db
            .run(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO bookings ({BOOKING_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
                    ),
                    params![
                        b.id.to_string(),
                        unix(b.start_at),
                        b.duration_minutes,
                        b.name,
                        b.email,
                        b.topic,
                        b.title,
                        b.status.as_str(),
                        b.payment_provider,
                        b.payment_status.as_str(),
                        b.amount,
                        b.currency,
                        b.provider_order_id,
                        b.provider_payment_id,
                        opt_unix(b.paid_at),
                        unix(b.created_at),
                        unix(b.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn find_by_id(&self, booking_id: Uuid) -> Result<Option<Booking>> {
        self.db.run(move |conn| select_booking(conn, &booking_id.to_string())).await
    }

    async fn find_by_payment(&self, order_id: &str, payment_id: &str) -> Result<Option<Booking>> {
        self.find_one(
            "provider_order_id = ?1 AND provider_payment_id = ?2",
            vec![order_id.to_string(), payment_id.to_string()],
        )
        .await
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Booking>> {
        self.find_one("provider_payment_id = ?1", vec![payment_id.to_string()]).await
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Booking>> {
        self.find_one("provider_order_id = ?1", vec![order_id.to_string()]).await
    }

    async fn list(&self, query: &BookingQuery) -> Result<Vec<Booking>> {
        let mut clauses = Vec::new();
        let mut args: Vec<Value> = Vec::new();
        if let Some(from) = query.starting_from {
            args.push(Value::Integer(unix(from)));
            clauses.push(format!("start_at >= ?{}", args.len()));
        }
        if let Some(status) = query.status {
            args.push(Value::Text(status.as_str().to_string()));
            clauses.push(format!("status = ?{}", args.len()));
        }
        let filter = if clauses.is_empty() { String::new() } else { format!("WHERE {}", clauses.join(" AND ")) };

        self.db
            .run(move |conn| {
                let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings {filter} ORDER BY start_at ASC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(args.iter()), map_booking)?;
                let bookings = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(bookings)
            })
            .await
    }

    async fn transition_status(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Booking>> {
        let key = booking_id.to_string();
        self.db
            .run(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let changed = tx.execute(
                    "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
                    params![to.as_str(), unix(updated_at), key, from.as_str()],
                )?;
                if changed == 0 {
                    return Ok(None);
                }
                if to == BookingStatus::Cancelled {
                    let released = tx.execute("DELETE FROM slot_locks WHERE booking_id = ?1", params![key])?;
                    debug!(booking_id = %key, released, "booking locks released");
                }
                let booking = select_booking(&tx, &key)?;
                tx.commit()?;
                Ok(booking)
            })
            .await
    }
}

// ============================================================================
// Checkouts
// ============================================================================

const CHECKOUT_COLUMNS: &str = "id, start_at, duration_minutes, name, email, topic, title, amount,
    currency, provider_order_id, provider_payment_id, booking_id, status, hold_expires_at,
    expires_at, created_at, updated_at";

/// Checkouts stored in the `checkouts` table.
pub struct SqliteCheckoutRepository {
    db: Arc<DbManager>,
}

impl SqliteCheckoutRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

fn map_checkout(row: &Row<'_>) -> rusqlite::Result<Checkout> {
    Ok(Checkout {
        id: id(row, 0)?,
        start_at: instant(row, 1)?,
        duration_minutes: minutes(row, 2)?,
        name: row.get(3)?,
        email: row.get(4)?,
        topic: row.get(5)?,
        title: row.get(6)?,
        amount: row.get(7)?,
        currency: row.get(8)?,
        provider_order_id: row.get(9)?,
        provider_payment_id: row.get(10)?,
        booking_id: opt_id(row, 11)?,
        status: status(row, 12)?,
        hold_expires_at: instant(row, 13)?,
        expires_at: instant(row, 14)?,
        created_at: instant(row, 15)?,
        updated_at: instant(row, 16)?,
    })
}

#[async_trait]
impl CheckoutRepository for SqliteCheckoutRepository {
    async fn insert(&self, checkout: &Checkout) -> Result<()> {
        let c = checkout.clone();
        self.db
            .run(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO checkouts ({CHECKOUT_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
                    ),
                    params![
                        c.id.to_string(),
                        unix(c.start_at),
                        c.duration_minutes,
                        c.name,
                        c.email,
                        c.topic,
                        c.title,
                        c.amount,
                        c.currency,
                        c.provider_order_id,
                        c.provider_payment_id,
                        c.booking_id.map(|b| b.to_string()),
                        c.status.as_str(),
                        unix(c.hold_expires_at),
                        unix(c.expires_at),
                        unix(c.created_at),
                        unix(c.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn find_by_id(&self, checkout_id: Uuid) -> Result<Option<Checkout>> {
        self.db
            .run(move |conn| {
                let sql = format!("SELECT {CHECKOUT_COLUMNS} FROM checkouts WHERE id = ?1");
                let checkout =
                    conn.query_row(&sql, params![checkout_id.to_string()], map_checkout).optional()?;
                Ok(checkout)
            })
            .await
    }

    async fn mark_paid(
        &self,
        checkout_id: Uuid,
        payment_id: &str,
        booking_id: Uuid,
        retain_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let payment_id = payment_id.to_string();
        self.db
            .run(move |conn| {
                conn.execute(
                    "UPDATE checkouts
                     SET status = ?1, provider_payment_id = ?2, booking_id = ?3, expires_at = ?4, updated_at = ?5
                     WHERE id = ?6",
                    params![
                        CheckoutStatus::Paid.as_str(),
                        payment_id,
                        booking_id.to_string(),
                        unix(retain_until),
                        unix(now),
                        checkout_id.to_string(),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let now = unix(now);
        self.db
            .run(move |conn| Ok(conn.execute("DELETE FROM checkouts WHERE expires_at <= ?1", params![now])?))
            .await
    }
}
