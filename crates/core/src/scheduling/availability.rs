//! Availability calculator
//!
//! Produces the free-slot grid for one duration across the horizon. The
//! result is a snapshot: a slot shown as free may be taken a moment later,
//! so write paths always go back through the ledger.

use std::collections::HashSet;
use std::sync::Arc;

use callslot_domain::constants::is_allowed_duration;
use callslot_domain::{AvailabilityDay, AvailabilityReport, Price, Result, SchedulingConfig, WindowHours};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::window::{self, NightWindow};
use crate::clock::Clock;
use crate::ledger_ports::SlotLockLedger;

/// Clamp a requested horizon to `1..=auto_days`, defaulting to `auto_days`.
pub fn horizon_days(config: &SchedulingConfig, requested: Option<u32>) -> u32 {
    requested.unwrap_or(config.auto_days).clamp(1, config.auto_days.max(1))
}

/// Lay out offerable slots for `windows`, skipping any candidate whose
/// blocks intersect `locked`.
pub fn build_days(
    config: &SchedulingConfig,
    windows: &[NightWindow],
    duration_minutes: u32,
    now: DateTime<Utc>,
    locked: &HashSet<DateTime<Utc>>,
) -> Vec<AvailabilityDay> {
    let tz = config.time_zone;
    let min_start = window::earliest_start(config, now);
    let today = window::local_date(tz, now);
    let step = Duration::minutes(i64::from(config.step_minutes.max(1)));
    let length = Duration::minutes(i64::from(duration_minutes));

    windows
        .iter()
        .map(|w| {
            let mut slots = Vec::new();
            let mut t = w.start.max(min_start);
            while t + length <= w.end {
                let blocks = window::block_starts(t, duration_minutes, config.step_minutes);
                let free = !blocks.is_empty() && blocks.iter().all(|b| !locked.contains(b));
                let same_day_ok = config.allow_same_day || window::local_date(tz, t) != today;
                if free && same_day_ok {
                    slots.push(t);
                }
                t += step;
            }
            AvailabilityDay { date: w.date, window_start_at: w.start, window_end_at: w.end, slots }
        })
        .collect()
}

/// Computes open start times from the window and the slot-lock ledger.
pub struct AvailabilityService {
    config: Arc<SchedulingConfig>,
    ledger: Arc<dyn SlotLockLedger>,
    clock: Arc<dyn Clock>,
}

impl AvailabilityService {
    /// Create a new availability service
    pub fn new(
        config: Arc<SchedulingConfig>,
        ledger: Arc<dyn SlotLockLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { config, ledger, clock }
    }

    /// Free slots for `duration_minutes` over up to `days` windows.
    ///
    /// Unsupported durations yield an empty grid rather than an error.
    pub async fn availability(&self, duration_minutes: u32, days: Option<u32>) -> Result<AvailabilityReport> {
        let config = self.config.as_ref();
        let now = self.clock.now();

        let days = if is_allowed_duration(duration_minutes) {
            let windows = window::horizon_windows(config, now, horizon_days(config, days));
            match (windows.first(), windows.last()) {
                (Some(first), Some(last)) => {
                    let locked = self.ledger.locked_blocks(first.start, last.end, now).await?;
                    debug!(
                        duration_minutes,
                        windows = windows.len(),
                        locked = locked.len(),
                        "computing availability"
                    );
                    build_days(config, &windows, duration_minutes, now, &locked)
                }
                _ => Vec::new(),
            }
        } else {
            Vec::new()
        };

        Ok(AvailabilityReport {
            time_zone: config.time_zone.name().to_string(),
            window: WindowHours { start_hour: config.window_start_hour, end_hour: config.window_end_hour },
            step_minutes: config.step_minutes,
            buffer_minutes: config.buffer_minutes,
            min_notice_minutes: config.min_notice_minutes,
            pricing: Price { amount: config.display_price(duration_minutes), currency: config.currency.clone() },
            require_payment: config.require_payment,
            duration_minutes,
            days,
        })
    }
}
