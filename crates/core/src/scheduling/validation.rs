//! Booking request validation
//!
//! Requests arrive as loose JSON. [`validate_booking`] turns them into a
//! tagged [`ValidationOutcome`]: either a normalized [`BookingCandidate`]
//! carrying its lock blocks, or the first [`ValidationFailure`] found. The
//! failure's `Display` text is shown to the client as-is.

use std::sync::Arc;

use callslot_domain::constants::is_allowed_duration;
use callslot_domain::{AvailabilityMode, CallSlotError, SchedulingConfig};
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::window;
use crate::clock::Clock;

static EMAIL_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// Pragmatic email shape check (not RFC 5322).
pub fn is_valid_email(value: &str) -> bool {
    let v = value.trim();
    !v.is_empty() && EMAIL_RE.as_ref().is_some_and(|re| re.is_match(v))
}

/// Raw booking request body. Every field is optional and untyped until
/// validated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub start_at: Option<Value>,
    pub duration_minutes: Option<Value>,
    pub name: Option<Value>,
    pub email: Option<Value>,
    pub topic: Option<Value>,
    pub title: Option<Value>,
}

/// Normalized, validated booking draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingCandidate {
    pub start_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub name: String,
    /// Trimmed and lower-cased.
    pub email: String,
    pub topic: String,
    pub title: String,
    /// Step-blocks the booking would occupy, ascending.
    pub blocks: Vec<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("startAt is required")]
    MissingStartAt,
    #[error("Invalid startAt")]
    InvalidStartAt,
    #[error("Invalid durationMinutes")]
    InvalidDuration,
    #[error("Name is required")]
    MissingName,
    #[error("Valid email is required")]
    InvalidEmail,
    #[error("Topic is required")]
    MissingTopic,
    #[error("Title is required")]
    MissingTitle,
    #[error("Slot must align to {step_minutes} minute steps")]
    Misaligned { step_minutes: u32 },
    #[error("Slot is no longer available")]
    TooSoon,
    #[error("Same-day bookings are not allowed")]
    SameDay,
    #[error("Slot outside allowed window")]
    OutsideWindow,
    #[error("Slot ends after allowed window")]
    EndsAfterWindow,
    #[error("Slot too far in future")]
    BeyondHorizon,
    #[error("Invalid slot duration")]
    InvalidSlotDuration,
}

impl From<ValidationFailure> for CallSlotError {
    fn from(failure: ValidationFailure) -> Self {
        Self::Validation(failure.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid(BookingCandidate),
    Invalid(ValidationFailure),
}

impl ValidationOutcome {
    pub fn into_result(self) -> Result<BookingCandidate, ValidationFailure> {
        match self {
            Self::Valid(candidate) => Ok(candidate),
            Self::Invalid(failure) => Err(failure),
        }
    }
}

fn text(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

fn duration(value: Option<&Value>) -> Option<u32> {
    let minutes = match value? {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX)).map(|f| f as u64)
        })?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u32::try_from(minutes).ok().filter(|m| is_allowed_duration(*m))
}

/// Validate `request` against `config` as of `now`.
///
/// Checks run in a fixed order and stop at the first failure.
pub fn validate_booking(
    request: &BookingRequest,
    config: &SchedulingConfig,
    now: DateTime<Utc>,
) -> ValidationOutcome {
    match check(request, config, now) {
        Ok(candidate) => ValidationOutcome::Valid(candidate),
        Err(failure) => ValidationOutcome::Invalid(failure),
    }
}

fn check(
    request: &BookingRequest,
    config: &SchedulingConfig,
    now: DateTime<Utc>,
) -> Result<BookingCandidate, ValidationFailure> {
    let raw_start = text(request.start_at.as_ref()).ok_or(ValidationFailure::MissingStartAt)?;
    let start_at = DateTime::parse_from_rfc3339(raw_start)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ValidationFailure::InvalidStartAt)?;
    let duration_minutes =
        duration(request.duration_minutes.as_ref()).ok_or(ValidationFailure::InvalidDuration)?;
    let name = text(request.name.as_ref()).ok_or(ValidationFailure::MissingName)?;
    let email = text(request.email.as_ref())
        .filter(|e| is_valid_email(e))
        .ok_or(ValidationFailure::InvalidEmail)?;
    let topic = text(request.topic.as_ref()).ok_or(ValidationFailure::MissingTopic)?;
    let title = text(request.title.as_ref()).ok_or(ValidationFailure::MissingTitle)?;

    let tz = config.time_zone;
    if !window::is_step_aligned(tz, start_at, config.step_minutes) {
        return Err(ValidationFailure::Misaligned { step_minutes: config.step_minutes });
    }

    if start_at < window::earliest_start(config, now) {
        return Err(ValidationFailure::TooSoon);
    }

    if !config.allow_same_day && window::local_date(tz, start_at) == window::local_date(tz, now) {
        return Err(ValidationFailure::SameDay);
    }

    let slot_window = window::window_containing(config, start_at).ok_or(ValidationFailure::OutsideWindow)?;
    let end_at = start_at + Duration::minutes(i64::from(duration_minutes));
    if start_at < slot_window.start {
        return Err(ValidationFailure::OutsideWindow);
    }
    if end_at > slot_window.end {
        return Err(ValidationFailure::EndsAfterWindow);
    }

    if config.availability_mode == AvailabilityMode::Auto && start_at >= window::horizon_end(config, now) {
        return Err(ValidationFailure::BeyondHorizon);
    }

    let blocks = window::block_starts(start_at, duration_minutes, config.step_minutes);
    if blocks.is_empty() {
        return Err(ValidationFailure::InvalidSlotDuration);
    }

    Ok(BookingCandidate {
        start_at,
        duration_minutes,
        name: name.to_string(),
        email: email.to_lowercase(),
        topic: topic.to_string(),
        title: title.to_string(),
        blocks,
    })
}

/// Validator bound to the process configuration and clock.
#[derive(Clone)]
pub struct BookingValidator {
    config: Arc<SchedulingConfig>,
    clock: Arc<dyn Clock>,
}

impl BookingValidator {
    pub fn new(config: Arc<SchedulingConfig>, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn validate(&self, request: &BookingRequest) -> ValidationOutcome {
        validate_booking(request, &self.config, self.clock.now())
    }
}
