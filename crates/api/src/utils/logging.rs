use std::time::Duration;

use callslot_domain::CallSlotError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ApiError;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,callslot=debug";

/// Install the global subscriber.
///
/// `CALLSLOT_LOG_FORMAT=json` switches to one JSON object per line. Calling
/// this twice is harmless; the second install is ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("CALLSLOT_LOG_FORMAT").is_ok_and(|v| v.trim().eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if json { builder.json().try_init() } else { builder.try_init() };
    if installed.is_err() {
        warn!("tracing subscriber already installed");
    }
}

/// Log the outcome of a command with structured fields.
///
/// `command` is a stable identifier such as `"calls::book"`; never put
/// request data in it.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, outcome: Result<(), &ApiError>) {
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    match outcome {
        Ok(()) => info!(command, duration_ms, "command_execution_success"),
        Err(err) => warn!(
            command,
            duration_ms,
            status = err.status().as_u16(),
            error_type = api_error_label(err),
            "command_execution_failure"
        ),
    }
}

/// Stable label for a domain error, suitable for log aggregation.
#[inline]
pub fn error_label(error: &CallSlotError) -> &'static str {
    match error {
        CallSlotError::Validation(_) => "validation",
        CallSlotError::Conflict(_) => "conflict",
        CallSlotError::PaymentIntegrity(_) => "payment_integrity",
        CallSlotError::PaymentRequired(_) => "payment_required",
        CallSlotError::ProviderUnavailable(_) => "provider_unavailable",
        CallSlotError::NotFound(_) => "not_found",
        CallSlotError::Database(_) => "database",
        CallSlotError::Config(_) => "config",
        CallSlotError::Network(_) => "network",
        CallSlotError::Internal(_) => "internal",
    }
}

fn api_error_label(error: &ApiError) -> &'static str {
    match error {
        ApiError::Domain(err) => error_label(err),
        ApiError::BadRequest(_) => "bad_request",
        ApiError::Unauthorized => "unauthorized",
    }
}
