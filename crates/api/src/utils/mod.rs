//! Shared helpers for the HTTP layer

pub mod auth;
pub mod command_helpers;
pub mod health;
pub mod logging;
