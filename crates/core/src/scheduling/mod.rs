//! Scheduling: window geometry, availability and booking validation

pub mod availability;
pub mod validation;
pub mod window;

pub use availability::AvailabilityService;
pub use validation::{
    validate_booking, BookingCandidate, BookingRequest, BookingValidator, ValidationFailure,
    ValidationOutcome,
};
pub use window::NightWindow;
