//! Configuration management
//!
//! [`AppConfig`] groups the process-level settings (database, HTTP server,
//! payment keys, email, admin access). [`SchedulingConfig`] holds the
//! booking rules and is produced by the pure [`resolve_scheduling_config`]
//! function, which never fails: every numeric input is clamped and invalid
//! values fall back to defaults.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::is_allowed_duration;
use crate::impl_status_conversions;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub payments: PaymentConfig,
    pub email: EmailConfig,
    pub admin: AdminConfig,
    pub housekeeping: HousekeepingConfig,
    /// Always resolved from the environment, never from a config file.
    #[serde(skip)]
    pub scheduling: SchedulingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "callslot.db".to_string(), pool_size: 8 }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:8080".to_string() }
    }
}

/// Payment provider credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    pub key_id: Option<String>,
    #[serde(skip_serializing)]
    pub key_secret: Option<String>,
    pub api_base: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self { key_id: None, key_secret: None, api_base: "https://api.razorpay.com".to_string() }
    }
}

impl PaymentConfig {
    /// Both key id and secret are present and non-empty.
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.key_id) && present(&self.key_secret)
    }
}

/// Outbound email transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    /// Write messages to the log instead of sending them.
    #[default]
    Log,
    /// Resend HTTP API.
    Resend,
}

impl_status_conversions!(EmailProvider {
    Log => "log",
    Resend => "resend",
});

/// Email notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub provider: EmailProvider,
    /// Admin recipients.
    pub to: Vec<String>,
    pub from: String,
    pub subject_prefix: String,
    #[serde(skip_serializing)]
    pub resend_api_key: Option<String>,
    pub resend_api_base: String,
    pub send_customer_emails: bool,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: EmailProvider::Log,
            to: Vec::new(),
            from: String::new(),
            subject_prefix: "Portfolio".to_string(),
            resend_api_key: None,
            resend_api_base: "https://api.resend.com".to_string(),
            send_customer_emails: true,
        }
    }
}

/// Admin surface access
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

/// Background reclamation schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HousekeepingConfig {
    pub cron_expression: String,
    pub enabled: bool,
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self { cron_expression: "0 * * * * *".to_string(), enabled: true }
    }
}

// ============================================================================
// Scheduling configuration
// ============================================================================

/// Whether the booking horizon is enforced on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityMode {
    #[default]
    Auto,
    Manual,
}

impl_status_conversions!(AvailabilityMode {
    Auto => "auto",
    Manual => "manual",
});

/// Booking rules. Immutable once resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulingConfig {
    pub availability_mode: AvailabilityMode,
    /// Slot and lock granularity, 5..=60.
    pub step_minutes: u32,
    pub buffer_minutes: u32,
    pub min_notice_minutes: u32,
    pub allow_same_day: bool,
    /// Horizon length in days, 1..=60.
    pub auto_days: u32,
    pub window_start_hour: u32,
    /// `<= window_start_hour` means the window wraps past midnight.
    pub window_end_hour: u32,
    pub time_zone: Tz,
    pub currency: String,
    /// Price of a 30-minute call in minor units.
    pub price_30: i64,
    /// Price of a 60-minute call in minor units.
    pub price_60: i64,
    pub hold_minutes: u32,
    pub require_payment: bool,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        resolve_scheduling_config(|_| None)
    }
}

impl SchedulingConfig {
    /// The nightly window crosses midnight.
    pub fn is_overnight(&self) -> bool {
        self.window_end_hour <= self.window_start_hour
    }

    /// Minimum lead time before a slot becomes bookable.
    pub fn lead_minutes(&self) -> u32 {
        self.buffer_minutes.max(self.min_notice_minutes)
    }

    /// Fixed price for an allowed duration.
    pub fn price_for(&self, duration_minutes: u32) -> Option<i64> {
        match duration_minutes {
            30 => Some(self.price_30),
            60 => Some(self.price_60),
            _ => None,
        }
    }

    /// Price to display next to an availability grid (zero for unknown durations).
    pub fn display_price(&self, duration_minutes: u32) -> i64 {
        if is_allowed_duration(duration_minutes) {
            self.price_for(duration_minutes).unwrap_or(0)
        } else {
            0
        }
    }
}

/// Resolve the scheduling rules from an environment-like lookup.
///
/// `lookup` returns the raw value for a variable name, or `None` when unset.
/// The function is pure: call it once at startup and pass the result around.
pub fn resolve_scheduling_config<F>(lookup: F) -> SchedulingConfig
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let availability_mode = var("CALL_AVAILABILITY_MODE")
        .and_then(|v| v.parse::<AvailabilityMode>().ok())
        .unwrap_or_default();

    let time_zone = var("CALL_TIME_ZONE")
        .or_else(|| var("TZ"))
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or(Tz::UTC);

    let payment_configured = var("RAZORPAY_KEY_ID").is_some() && var("RAZORPAY_KEY_SECRET").is_some();

    SchedulingConfig {
        availability_mode,
        step_minutes: clamp_u32(var("CALL_SLOT_STEP_MINUTES"), 30, 5, 60),
        buffer_minutes: clamp_u32(var("CALL_BUFFER_MINUTES"), 15, 0, 240),
        min_notice_minutes: clamp_u32(var("CALL_MIN_NOTICE_MINUTES"), 0, 0, 10_080),
        allow_same_day: parse_flag(var("CALL_ALLOW_SAME_DAY"), true),
        auto_days: clamp_u32(var("CALL_AUTO_DAYS"), 14, 1, 60),
        window_start_hour: clamp_u32(var("CALL_WINDOW_START_HOUR"), 20, 0, 23),
        window_end_hour: clamp_u32(var("CALL_WINDOW_END_HOUR"), 9, 0, 23),
        time_zone,
        currency: var("CALL_CURRENCY").unwrap_or_else(|| "INR".to_string()),
        price_30: clamp_i64(var("CALL_PRICE_30"), 49_900, 0, i64::MAX),
        price_60: clamp_i64(var("CALL_PRICE_60"), 89_900, 0, i64::MAX),
        hold_minutes: clamp_u32(var("CALL_HOLD_MINUTES"), 10, 1, 30),
        require_payment: parse_flag(var("CALL_REQUIRE_PAYMENT"), payment_configured),
    }
}

/// Parse an integer, fall back on garbage, then clamp into `[min, max]`.
pub fn clamp_i64(raw: Option<String>, fallback: i64, min: i64, max: i64) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(fallback).clamp(min, max)
}

fn clamp_u32(raw: Option<String>, fallback: u32, min: u32, max: u32) -> u32 {
    let clamped = clamp_i64(raw, i64::from(fallback), i64::from(min), i64::from(max));
    u32::try_from(clamped).unwrap_or(fallback)
}

/// Accepts `1/true/yes/on` and `0/false/no/off` (case-insensitive).
pub fn parse_flag(raw: Option<String>, default: bool) -> bool {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
