//! SQLite-backed slot-lock ledger.
//!
//! Every write is a single `BEGIN IMMEDIATE` transaction, so concurrent
//! writers serialise on the database lock and the `block_start` primary key
//! decides who wins. A failed insert drops the transaction, which rolls back
//! any rows this attempt already wrote.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use callslot_core::{ConversionOutcome, SlotLockLedger};
use callslot_domain::{CallSlotError, LockKind, LockOwner, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, TransactionBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use super::manager::DbManager;
use super::rows::{from_unix, opt_unix, unix};

/// Slot-lock ledger stored in the `slot_locks` table.
pub struct SqliteSlotLockLedger {
    db: Arc<DbManager>,
}

impl SqliteSlotLockLedger {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

/// Owner column for `owner`, as `(booking_id, hold_id)`.
fn owner_columns(owner: LockOwner) -> (Option<String>, Option<String>) {
    match owner {
        LockOwner::Booking(id) => (Some(id.to_string()), None),
        LockOwner::Hold(id) => (None, Some(id.to_string())),
    }
}

fn owner_filter(owner: LockOwner) -> (&'static str, String) {
    match owner {
        LockOwner::Booking(id) => ("booking_id", id.to_string()),
        LockOwner::Hold(id) => ("hold_id", id.to_string()),
    }
}

#[async_trait]
impl SlotLockLedger for SqliteSlotLockLedger {
    async fn acquire(
        &self,
        owner: LockOwner,
        blocks: &[DateTime<Utc>],
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if blocks.is_empty() {
            return Ok(());
        }
        let starts: Vec<i64> = blocks.iter().copied().map(unix).collect();
        let count = starts.len();
        let (booking_col, hold_col) = owner_columns(owner);
        let kind = owner.kind().as_str();
        let expires = opt_unix(expires_at);
        let now = unix(now);

        let result = self
            .db
            .run(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                {
                    let mut reclaim = tx.prepare_cached(
                        "DELETE FROM slot_locks
                         WHERE block_start = ?1 AND kind = 'hold' AND expires_at <= ?2",
                    )?;
                    let mut insert = tx.prepare_cached(
                        "INSERT INTO slot_locks (block_start, kind, booking_id, hold_id, expires_at, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    )?;
                    for start in &starts {
                        reclaim.execute(params![start, now])?;
                        insert.execute(params![start, kind, booking_col, hold_col, expires, now])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await;

        match result {
            Ok(()) => {
                debug!(owner = %owner, blocks = count, "slot locks acquired");
                Ok(())
            }
            Err(err) if err.is_conflict() => {
                info!(owner = %owner, blocks = count, "slot lock conflict");
                Err(CallSlotError::slot_taken())
            }
            Err(err) => Err(err),
        }
    }

    async fn convert(
        &self,
        hold_id: Uuid,
        booking_id: Uuid,
        expected: usize,
        now: DateTime<Utc>,
    ) -> Result<ConversionOutcome> {
        let now = unix(now);
        let outcome = self
            .db
            .run(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let converted = tx.execute(
                    "UPDATE slot_locks
                     SET kind = 'booking', booking_id = ?1, hold_id = NULL, expires_at = NULL
                     WHERE kind = 'hold' AND hold_id = ?2 AND expires_at > ?3",
                    params![booking_id.to_string(), hold_id.to_string(), now],
                )?;
                if converted == expected {
                    tx.commit()?;
                    Ok(ConversionOutcome::Converted)
                } else {
                    tx.rollback()?;
                    Ok(ConversionOutcome::Incomplete { found: converted })
                }
            })
            .await?;

        debug!(%hold_id, %booking_id, expected, ?outcome, "hold conversion");
        Ok(outcome)
    }

    async fn release(&self, owner: LockOwner) -> Result<usize> {
        let (column, id) = owner_filter(owner);
        let sql = format!("DELETE FROM slot_locks WHERE {column} = ?1");
        let released = self
            .db
            .run(move |conn| Ok(conn.execute(&sql, params![id])?))
            .await?;
        debug!(owner = %owner, released, "slot locks released");
        Ok(released)
    }

    async fn locked_blocks(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<HashSet<DateTime<Utc>>> {
        let (from, to, now) = (unix(from), unix(to), unix(now));
        self.db
            .run(move |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT block_start FROM slot_locks
                     WHERE block_start >= ?1 AND block_start < ?2
                       AND (kind = 'booking' OR expires_at > ?3)",
                )?;
                let rows = stmt.query_map(params![from, to, now], |row| from_unix(0, row.get(0)?))?;
                let mut locked = HashSet::new();
                for block in rows {
                    locked.insert(block?);
                }
                Ok(locked)
            })
            .await
    }

    async fn blocks_owned_by(&self, owner: LockOwner) -> Result<Vec<DateTime<Utc>>> {
        let (column, id) = owner_filter(owner);
        let kind = owner.kind();
        let sql = format!(
            "SELECT block_start FROM slot_locks WHERE {column} = ?1 AND kind = ?2 ORDER BY block_start"
        );
        self.db
            .run(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![id, kind.as_str()], |row| from_unix(0, row.get(0)?))?;
                let blocks = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(blocks)
            })
            .await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let now = unix(now);
        self.db
            .run(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM slot_locks WHERE kind = ?1 AND expires_at <= ?2",
                    params![LockKind::Hold.as_str(), now],
                )?)
            })
            .await
    }
}
