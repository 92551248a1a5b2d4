//! Payment provider adapters

pub mod razorpay;

pub use razorpay::{sign_payment, RazorpayGateway};
