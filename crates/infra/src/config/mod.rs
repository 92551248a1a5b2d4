//! Configuration loading
//!
//! Builds [`callslot_domain::AppConfig`] from `.env`, an optional JSON/TOML
//! file and the process environment.

pub mod loader;

pub use loader::{find_config_file, load, load_from_file, load_with};
