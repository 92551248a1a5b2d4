//! Error types used throughout the service

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for CallSlot
///
/// The variants follow the booking error taxonomy: callers branch on the
/// variant (never on the message) to choose a response status.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CallSlotError {
    /// Malformed, out-of-window or too-soon request. Message is user-facing.
    #[error("{0}")]
    Validation(String),

    /// A slot-lock uniqueness violation: the slot is no longer available.
    #[error("{0}")]
    Conflict(String),

    /// Payment proof could not be trusted (signature, amount, capture state).
    #[error("{0}")]
    PaymentIntegrity(String),

    /// The free path was used while payment is required.
    #[error("{0}")]
    PaymentRequired(String),

    /// Payment provider is not configured.
    #[error("{0}")]
    ProviderUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CallSlotError {
    /// Conflict raised when a slot lock cannot be taken.
    pub fn slot_taken() -> Self {
        Self::Conflict("Slot already booked".into())
    }

    /// Whether this error is a slot-lock conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Result type alias for CallSlot operations
pub type Result<T> = std::result::Result<T, CallSlotError>;
