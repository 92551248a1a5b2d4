//! SQLite-backed refund request repository.

use std::sync::Arc;

use async_trait::async_trait;
use callslot_core::{RefundQuery, RefundRequestRepository};
use callslot_domain::{RefundRequest, RefundStatus, Result};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::manager::DbManager;
use super::rows::{id, instant, opt_id, opt_instant, opt_unix, status, unix};

const REFUND_COLUMNS: &str = "id, name, email, reason, booking_id, provider_order_id,
    provider_payment_id, amount_minor, currency, status, admin_note, refund_id, processed_at,
    created_at, updated_at";

/// Refund requests stored in the `refund_requests` table.
pub struct SqliteRefundRepository {
    db: Arc<DbManager>,
}

impl SqliteRefundRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

fn map_refund(row: &Row<'_>) -> rusqlite::Result<RefundRequest> {
    Ok(RefundRequest {
        id: id(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        reason: row.get(3)?,
        booking_id: opt_id(row, 4)?,
        provider_order_id: row.get(5)?,
        provider_payment_id: row.get(6)?,
        amount_minor: row.get(7)?,
        currency: row.get(8)?,
        status: status(row, 9)?,
        admin_note: row.get(10)?,
        refund_id: row.get(11)?,
        processed_at: opt_instant(row, 12)?,
        created_at: instant(row, 13)?,
        updated_at: instant(row, 14)?,
    })
}

#[async_trait]
impl RefundRequestRepository for SqliteRefundRepository {
    async fn insert(&self, request: &RefundRequest) -> Result<()> {
        let r = request.clone();
        self.db
            .run(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO refund_requests ({REFUND_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
                    ),
                    params![
                        r.id.to_string(),
                        r.name,
                        r.email,
                        r.reason,
                        r.booking_id.map(|b| b.to_string()),
                        r.provider_order_id,
                        r.provider_payment_id,
                        r.amount_minor,
                        r.currency,
                        r.status.as_str(),
                        r.admin_note,
                        r.refund_id,
                        opt_unix(r.processed_at),
                        unix(r.created_at),
                        unix(r.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn find_by_id(&self, request_id: Uuid) -> Result<Option<RefundRequest>> {
        self.db
            .run(move |conn| {
                let sql = format!("SELECT {REFUND_COLUMNS} FROM refund_requests WHERE id = ?1");
                Ok(conn.query_row(&sql, params![request_id.to_string()], map_refund).optional()?)
            })
            .await
    }

    async fn transition(&self, request: &RefundRequest, from: RefundStatus) -> Result<bool> {
        let r = request.clone();
        self.db
            .run(move |conn| {
                let changed = conn.execute(
                    "UPDATE refund_requests
                     SET status = ?1, admin_note = ?2, refund_id = ?3, amount_minor = ?4,
                         currency = ?5, processed_at = ?6, updated_at = ?7
                     WHERE id = ?8 AND status = ?9",
                    params![
                        r.status.as_str(),
                        r.admin_note,
                        r.refund_id,
                        r.amount_minor,
                        r.currency,
                        opt_unix(r.processed_at),
                        unix(r.updated_at),
                        r.id.to_string(),
                        from.as_str(),
                    ],
                )?;
                Ok(changed == 1)
            })
            .await
    }

    async fn list(&self, query: &RefundQuery) -> Result<(Vec<RefundRequest>, u64)> {
        let status = query.status.map(|s| s.as_str());
        let (limit, skip) = (i64::from(query.limit), i64::from(query.skip));
        self.db
            .run(move |conn| {
                let total: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM refund_requests WHERE ?1 IS NULL OR status = ?1",
                    params![status],
                    |row| row.get(0),
                )?;
                let sql = format!(
                    "SELECT {REFUND_COLUMNS} FROM refund_requests
                     WHERE ?1 IS NULL OR status = ?1
                     ORDER BY created_at DESC, id DESC
                     LIMIT ?2 OFFSET ?3"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![status, limit, skip], map_refund)?;
                let requests = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                Ok((requests, u64::try_from(total).unwrap_or(0)))
            })
            .await
    }
}
