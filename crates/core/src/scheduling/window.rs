//! Nightly window geometry in the configured time zone
//!
//! All slot and lock instants are UTC; wall-clock rules (window hours, step
//! alignment, "today") are evaluated in [`SchedulingConfig::time_zone`].

use callslot_domain::SchedulingConfig;
use chrono::{DateTime, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// One occurrence of the bookable window, labelled by its start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightWindow {
    /// Local date on which the window opens.
    pub date: NaiveDate,
    /// Window open, inclusive.
    pub start: DateTime<Utc>,
    /// Window close, exclusive. Past midnight for a wrapping window.
    pub end: DateTime<Utc>,
}

impl NightWindow {
    pub fn contains(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start >= self.start && end <= self.end
    }
}

/// Instant of `hour:00` on `date` in `tz`.
///
/// Ambiguous times resolve to the earlier instant; times skipped by a DST
/// jump move forward one hour.
pub fn local_instant(tz: Tz, date: NaiveDate, hour: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let naive = NaiveDateTime::new(date, time);
    resolve_local(tz, naive)
        .or_else(|| resolve_local(tz, naive + Duration::hours(1)))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

fn resolve_local(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive).earliest().map(|dt| dt.with_timezone(&Utc))
}

pub fn local_date(tz: Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days))).unwrap_or(date)
}

fn previous_day(date: NaiveDate) -> NaiveDate {
    date.pred_opt().unwrap_or(date)
}

/// The window that opens on `date`.
pub fn window_for_start_date(config: &SchedulingConfig, date: NaiveDate) -> NightWindow {
    let end_date = if config.is_overnight() { add_days(date, 1) } else { date };
    NightWindow {
        date,
        start: local_instant(config.time_zone, date, config.window_start_hour),
        end: local_instant(config.time_zone, end_date, config.window_end_hour),
    }
}

/// The window whose hours cover `instant`'s wall-clock hour.
///
/// For an overnight window an early-morning instant belongs to the window
/// that opened the previous evening. Returns `None` when an overnight
/// window's hours do not include the instant. A same-day window is always
/// returned and the caller checks the bounds.
pub fn window_containing(config: &SchedulingConfig, instant: DateTime<Utc>) -> Option<NightWindow> {
    let local = instant.with_timezone(&config.time_zone);
    let hour = local.hour();
    let day = local.date_naive();

    if !config.is_overnight() {
        return Some(window_for_start_date(config, day));
    }

    if hour >= config.window_start_hour {
        Some(window_for_start_date(config, day))
    } else if hour < config.window_end_hour {
        Some(window_for_start_date(config, previous_day(day)))
    } else {
        None
    }
}

/// Start date of the window in progress (or next to open) at `now`.
pub fn base_day(config: &SchedulingConfig, now: DateTime<Utc>) -> NaiveDate {
    let local = now.with_timezone(&config.time_zone);
    let today = local.date_naive();
    if config.is_overnight() && local.hour() < config.window_end_hour {
        previous_day(today)
    } else {
        today
    }
}

/// First window start date offered to clients.
///
/// With same-day bookings disabled a same-day window is skipped outright,
/// while an overnight window opening today is kept because its
/// after-midnight slots fall on tomorrow.
pub fn first_offered_day(config: &SchedulingConfig, now: DateTime<Utc>) -> NaiveDate {
    if config.allow_same_day {
        return base_day(config, now);
    }
    let today = local_date(config.time_zone, now);
    if config.is_overnight() { today } else { add_days(today, 1) }
}

/// Window start dates covered by a horizon of `days` windows.
pub fn horizon_windows(config: &SchedulingConfig, now: DateTime<Utc>, days: u32) -> Vec<NightWindow> {
    let first = first_offered_day(config, now);
    (0..days.max(1)).map(|i| window_for_start_date(config, add_days(first, i))).collect()
}

/// End of the last window inside the configured horizon.
pub fn horizon_end(config: &SchedulingConfig, now: DateTime<Utc>) -> DateTime<Utc> {
    let first = first_offered_day(config, now);
    let last = add_days(first, config.auto_days.saturating_sub(1));
    window_for_start_date(config, last).end
}

/// Round up to the next wall-clock minute that is a multiple of `step`.
///
/// Sub-minute remainders always round up to the next whole minute first.
pub fn ceil_to_step(tz: Tz, instant: DateTime<Utc>, step_minutes: u32) -> DateTime<Utc> {
    let sub_minute = i64::from(instant.second()) * 1_000_000_000 + i64::from(instant.nanosecond());
    let mut t = instant - Duration::nanoseconds(sub_minute);
    if sub_minute != 0 {
        t += Duration::minutes(1);
    }

    if step_minutes == 0 {
        return t;
    }
    let remainder = t.with_timezone(&tz).minute() % step_minutes;
    if remainder != 0 {
        t += Duration::minutes(i64::from(step_minutes - remainder));
    }
    t
}

/// Earliest bookable start: now plus lead time, rounded up to a step.
pub fn earliest_start(config: &SchedulingConfig, now: DateTime<Utc>) -> DateTime<Utc> {
    let lead = now + Duration::minutes(i64::from(config.lead_minutes()));
    ceil_to_step(config.time_zone, lead, config.step_minutes)
}

/// Whether `instant` sits exactly on a local step boundary.
pub fn is_step_aligned(tz: Tz, instant: DateTime<Utc>, step_minutes: u32) -> bool {
    step_minutes > 0
        && instant.second() == 0
        && instant.nanosecond() == 0
        && instant.with_timezone(&tz).minute() % step_minutes == 0
}

/// Contiguous step-block starts covering `[start, start + duration)`.
///
/// Empty when the duration is not an exact multiple of the step.
pub fn block_starts(start: DateTime<Utc>, duration_minutes: u32, step_minutes: u32) -> Vec<DateTime<Utc>> {
    if step_minutes == 0 || duration_minutes == 0 || duration_minutes % step_minutes != 0 {
        return Vec::new();
    }
    (0..duration_minutes / step_minutes)
        .map(|i| start + Duration::minutes(i64::from(i * step_minutes)))
        .collect()
}

#[cfg(test)]
mod tests {
    use callslot_domain::resolve_scheduling_config;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> SchedulingConfig {
        let pairs: Vec<(String, String)> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        resolve_scheduling_config(|key| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()))
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).single().expect("valid instant")
    }

    #[test]
    fn overnight_window_ends_next_day() {
        let cfg = config(&[]);
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).expect("date");
        let w = window_for_start_date(&cfg, date);
        assert_eq!(w.start, utc(2025, 3, 1, 20, 0));
        assert_eq!(w.end, utc(2025, 3, 2, 9, 0));
    }

    #[test]
    fn early_morning_belongs_to_previous_window() {
        let cfg = config(&[]);
        let w = window_containing(&cfg, utc(2025, 3, 2, 3, 0)).expect("inside window");
        assert_eq!(w.date, NaiveDate::from_ymd_opt(2025, 3, 1).expect("date"));
        assert!(window_containing(&cfg, utc(2025, 3, 2, 12, 0)).is_none());
    }

    #[test]
    fn base_day_backs_up_before_window_end() {
        let cfg = config(&[]);
        assert_eq!(base_day(&cfg, utc(2025, 3, 2, 8, 59)), NaiveDate::from_ymd_opt(2025, 3, 1).expect("date"));
        assert_eq!(base_day(&cfg, utc(2025, 3, 2, 9, 0)), NaiveDate::from_ymd_opt(2025, 3, 2).expect("date"));
    }

    #[test]
    fn ceil_rounds_sub_minutes_then_steps() {
        let tz = Tz::UTC;
        assert_eq!(ceil_to_step(tz, utc(2025, 3, 1, 20, 0), 30), utc(2025, 3, 1, 20, 0));
        assert_eq!(ceil_to_step(tz, utc(2025, 3, 1, 20, 5), 30), utc(2025, 3, 1, 20, 30));
        let with_seconds = utc(2025, 3, 1, 20, 29) + Duration::seconds(1);
        assert_eq!(ceil_to_step(tz, with_seconds, 30), utc(2025, 3, 1, 20, 30));
        assert_eq!(ceil_to_step(tz, utc(2025, 3, 1, 20, 31), 15), utc(2025, 3, 1, 20, 45));
    }

    #[test]
    fn ceil_uses_local_minutes_for_half_hour_zones() {
        // Kolkata is UTC+05:30, so local :00 is UTC :30.
        let tz = chrono_tz::Asia::Kolkata;
        assert_eq!(ceil_to_step(tz, utc(2025, 3, 1, 14, 20), 60), utc(2025, 3, 1, 14, 30));
    }

    #[test]
    fn blocks_cover_duration_in_steps() {
        let start = utc(2025, 3, 1, 20, 0);
        assert_eq!(block_starts(start, 60, 30), vec![start, utc(2025, 3, 1, 20, 30)]);
        assert_eq!(block_starts(start, 30, 30), vec![start]);
        assert!(block_starts(start, 30, 60).is_empty());
        assert!(block_starts(start, 60, 25).is_empty());
    }

    #[test]
    fn same_day_window_when_end_after_start() {
        let cfg = config(&[("CALL_WINDOW_START_HOUR", "9"), ("CALL_WINDOW_END_HOUR", "17")]);
        let w = window_for_start_date(&cfg, NaiveDate::from_ymd_opt(2025, 3, 1).expect("date"));
        assert_eq!((w.start, w.end), (utc(2025, 3, 1, 9, 0), utc(2025, 3, 1, 17, 0)));
        assert_eq!(base_day(&cfg, utc(2025, 3, 1, 3, 0)), NaiveDate::from_ymd_opt(2025, 3, 1).expect("date"));
    }

    #[test]
    fn dst_gap_moves_forward() {
        // 2025-03-09 02:00 does not exist in New York.
        let tz = chrono_tz::America::New_York;
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).expect("date");
        assert_eq!(local_instant(tz, date, 2), utc(2025, 3, 9, 7, 0));
    }

    #[test]
    fn first_offered_day_without_same_day() {
        let overnight = config(&[("CALL_ALLOW_SAME_DAY", "false")]);
        let now = utc(2025, 3, 1, 10, 0);
        assert_eq!(first_offered_day(&overnight, now), NaiveDate::from_ymd_opt(2025, 3, 1).expect("date"));

        let daytime = config(&[
            ("CALL_ALLOW_SAME_DAY", "false"),
            ("CALL_WINDOW_START_HOUR", "9"),
            ("CALL_WINDOW_END_HOUR", "17"),
        ]);
        assert_eq!(first_offered_day(&daytime, now), NaiveDate::from_ymd_opt(2025, 3, 2).expect("date"));
    }
}
