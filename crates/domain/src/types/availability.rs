//! Availability grid returned to clients

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

/// One bucket per window start date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityDay {
    /// Local calendar date the window starts on (`YYYY-MM-DD`).
    pub date: NaiveDate,
    pub window_start_at: DateTime<Utc>,
    pub window_end_at: DateTime<Utc>,
    /// Offerable start instants, ascending.
    pub slots: Vec<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[serde(rename_all = "camelCase")]
pub struct WindowHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
pub struct Price {
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub amount: i64,
    pub currency: String,
}

/// Slot grid plus the config values needed to render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityReport {
    pub time_zone: String,
    pub window: WindowHours,
    pub step_minutes: u32,
    pub buffer_minutes: u32,
    pub min_notice_minutes: u32,
    pub pricing: Price,
    pub require_payment: bool,
    pub duration_minutes: u32,
    pub days: Vec<AvailabilityDay>,
}

impl AvailabilityReport {
    pub fn slot_count(&self) -> usize {
        self.days.iter().map(|d| d.slots.len()).sum()
    }
}
