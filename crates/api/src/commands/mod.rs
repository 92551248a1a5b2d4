//! HTTP command handlers

pub mod admin_calls;
pub mod calls;
pub mod health;
pub mod refunds;
