//! Booking services: free path, checkout orchestration, admin transitions

pub mod checkout;
pub mod ports;
pub mod service;

pub use checkout::{CheckoutService, VerifyRequest};
pub use service::BookingService;
