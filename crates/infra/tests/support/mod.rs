//! Shared helpers for `callslot-infra` integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use callslot_core::{Clock, NotificationDispatcher};
use callslot_domain::{resolve_scheduling_config, LockOwner, SchedulingConfig};
use callslot_infra::{DbManager, LogMailer};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Temporary database that keeps its directory alive for the test.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let manager = DbManager::new(temp_dir.path().join("callslot.db"), 8)
            .expect("db manager should be created");
        manager.run_migrations().expect("schema should apply");
        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }

    /// A second, independent pool on the same file.
    pub fn second_pool(&self) -> Arc<DbManager> {
        Arc::new(DbManager::new(self.manager.path(), 4).expect("second pool"))
    }

    /// Owners of every stored lock row in `[from, to)`, expired holds included.
    pub fn stored_lock_owners(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<LockOwner> {
        let conn = self.manager.get_connection().expect("connection");
        let mut stmt = conn
            .prepare(
                "SELECT booking_id, hold_id FROM slot_locks
                 WHERE block_start >= ?1 AND block_start < ?2 ORDER BY block_start",
            )
            .expect("prepare");
        let rows = stmt
            .query_map([from.timestamp(), to.timestamp()], |row| {
                Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?))
            })
            .expect("query");
        rows.map(|row| match row.expect("row") {
            (Some(booking), None) => LockOwner::Booking(booking.parse().expect("booking id")),
            (None, Some(hold)) => LockOwner::Hold(hold.parse().expect("hold id")),
            other => panic!("lock row must have exactly one owner: {other:?}"),
        })
        .collect()
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn utc(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, minute, 0).single().expect("valid instant")
}

pub fn config(pairs: &[(&str, &str)]) -> Arc<SchedulingConfig> {
    let pairs: Vec<(String, String)> =
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
    Arc::new(resolve_scheduling_config(|key| {
        pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }))
}

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self { now: Mutex::new(now) })
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().expect("clock lock") += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

pub fn dispatcher(config: &SchedulingConfig) -> NotificationDispatcher {
    NotificationDispatcher::new(Arc::new(LogMailer), config.time_zone)
        .with_admin_recipients(vec!["owner@example.com".into()])
}

pub fn request_body(start_at: &str, duration: u32) -> Value {
    json!({
        "startAt": start_at,
        "durationMinutes": duration,
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "topic": "Rust",
        "title": "Architecture review"
    })
}
