//! Configuration loader
//!
//! ## Loading Strategy
//! 1. `.env` in the working directory is read into the process environment
//!    (existing variables win).
//! 2. A config file supplies the non-scheduling sections: the path in
//!    `CALLSLOT_CONFIG`, else the first found `callslot.{json,toml}`.
//! 3. Environment variables override file values.
//! 4. Scheduling rules always come from the environment through
//!    [`resolve_scheduling_config`].
//!
//! ## Environment Variables
//! - `CALLSLOT_DB_PATH`, `CALLSLOT_DB_POOL_SIZE`
//! - `CALLSLOT_BIND_ADDR`
//! - `RAZORPAY_KEY_ID`, `RAZORPAY_KEY_SECRET`, `RAZORPAY_API_BASE`
//! - `EMAIL_PROVIDER` (`log` | `resend`), `EMAIL_TO` (CSV, falls back to
//!   `ADMIN_EMAIL`), `EMAIL_FROM`, `EMAIL_SUBJECT_PREFIX`, `RESEND_API_KEY`,
//!   `EMAIL_SEND_CUSTOMERS`
//! - `CALLSLOT_ADMIN_TOKEN`
//! - `CALLSLOT_SWEEP_CRON`, `CALLSLOT_SWEEP_ENABLED`
//! - `CALL_*` scheduling variables (see [`resolve_scheduling_config`])

use std::path::{Path, PathBuf};

use callslot_domain::{
    clamp_i64, parse_flag, resolve_scheduling_config, AppConfig, CallSlotError, EmailProvider,
    Result,
};
use tracing::{debug, info, warn};

/// Load configuration from `.env`, the optional config file and the
/// process environment.
///
/// # Errors
/// Returns `CallSlotError::Config` when an explicitly named config file is
/// missing or malformed.
pub fn load() -> Result<AppConfig> {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(error = %err, "ignoring unreadable .env"),
    }

    let base = match std::env::var("CALLSLOT_CONFIG").ok().filter(|p| !p.trim().is_empty()) {
        Some(path) => load_from_file(Some(PathBuf::from(path)))?,
        None => match find_config_file() {
            Some(path) => load_from_file(Some(path))?,
            None => AppConfig::default(),
        },
    };

    let config = load_with(base, |key| std::env::var(key).ok());
    info!(
        db_path = %config.database.path,
        payments = config.payments.is_configured(),
        require_payment = config.scheduling.require_payment,
        time_zone = %config.scheduling.time_zone,
        email_provider = %config.email.provider,
        admin_enabled = config.admin.token.is_some(),
        "configuration loaded"
    );
    Ok(config)
}

/// Apply environment overrides from `lookup` on top of `base`.
pub fn load_with<F>(mut config: AppConfig, lookup: F) -> AppConfig
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(path) = var("CALLSLOT_DB_PATH") {
        config.database.path = path;
    }
    let pool_size = clamp_i64(var("CALLSLOT_DB_POOL_SIZE"), i64::from(config.database.pool_size), 1, 64);
    config.database.pool_size = u32::try_from(pool_size).unwrap_or(config.database.pool_size);

    if let Some(addr) = var("CALLSLOT_BIND_ADDR") {
        config.server.bind_addr = addr;
    }

    if let Some(key_id) = var("RAZORPAY_KEY_ID") {
        config.payments.key_id = Some(key_id);
    }
    if let Some(secret) = var("RAZORPAY_KEY_SECRET") {
        config.payments.key_secret = Some(secret);
    }
    if let Some(base) = var("RAZORPAY_API_BASE") {
        config.payments.api_base = base;
    }

    if let Some(provider) = var("EMAIL_PROVIDER") {
        config.email.provider = provider.parse::<EmailProvider>().unwrap_or_else(|err| {
            warn!(error = %err, "unsupported email provider, using log");
            EmailProvider::Log
        });
    }
    let to = split_csv(var("EMAIL_TO").as_deref());
    let to = if to.is_empty() {
        split_csv(var("ADMIN_EMAIL").map(|v| v.to_lowercase()).as_deref())
    } else {
        to
    };
    if !to.is_empty() {
        config.email.to = to;
    }
    if let Some(from) = var("EMAIL_FROM") {
        config.email.from = from;
    }
    if let Some(prefix) = var("EMAIL_SUBJECT_PREFIX") {
        config.email.subject_prefix = prefix.split_whitespace().collect::<Vec<_>>().join(" ");
    }
    if let Some(key) = var("RESEND_API_KEY") {
        config.email.resend_api_key = Some(key);
    }
    config.email.send_customer_emails =
        parse_flag(var("EMAIL_SEND_CUSTOMERS"), config.email.send_customer_emails);

    if let Some(token) = var("CALLSLOT_ADMIN_TOKEN") {
        config.admin.token = Some(token);
    }
    config.admin.token = config.admin.token.take().filter(|t| !t.trim().is_empty());

    if let Some(cron) = var("CALLSLOT_SWEEP_CRON") {
        config.housekeeping.cron_expression = cron;
    }
    config.housekeeping.enabled = parse_flag(var("CALLSLOT_SWEEP_ENABLED"), config.housekeeping.enabled);

    config.scheduling = resolve_scheduling_config(&lookup);
    // Keys may come from the config file, which the resolver never sees.
    if var("CALL_REQUIRE_PAYMENT").is_none() {
        config.scheduling.require_payment = config.payments.is_configured();
    }

    config
}

/// Load the non-scheduling sections from a file.
///
/// If `path` is `None`, searches the standard locations.
///
/// # Errors
/// Returns `CallSlotError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<AppConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CallSlotError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => find_config_file().ok_or_else(|| {
            CallSlotError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    info!(path = %config_path.display(), "loading configuration file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CallSlotError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CallSlotError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CallSlotError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(CallSlotError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing `callslot.{json,toml}` in the working directory, its
/// parent, or next to the executable.
pub fn find_config_file() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.join(".."));
        dirs.insert(0, cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        dirs.push(exe_dir);
    }

    dirs.into_iter()
        .flat_map(|dir| [dir.join("callslot.json"), dir.join("callslot.toml")])
        .find(|path| path.exists())
}

fn split_csv(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value.split(',').map(str::trim).filter(|v| !v.is_empty()).map(str::to_string).collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use callslot_domain::AvailabilityMode;
    use tempfile::Builder;

    use super::*;

    fn apply(pairs: &[(&str, &str)]) -> AppConfig {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        load_with(AppConfig::default(), |key| env.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = apply(&[]);
        assert_eq!(config.database.path, "callslot.db");
        assert_eq!(config.email.provider, EmailProvider::Log);
        assert!(config.email.send_customer_emails);
        assert!(config.admin.token.is_none());
        assert!(!config.scheduling.require_payment);
        assert_eq!(config.housekeeping.cron_expression, "0 * * * * *");
    }

    #[test]
    fn payment_keys_turn_on_required_payment() {
        let config = apply(&[("RAZORPAY_KEY_ID", "rzp_test"), ("RAZORPAY_KEY_SECRET", "shh")]);
        assert!(config.payments.is_configured());
        assert!(config.scheduling.require_payment);

        let config = apply(&[
            ("RAZORPAY_KEY_ID", "rzp_test"),
            ("RAZORPAY_KEY_SECRET", "shh"),
            ("CALL_REQUIRE_PAYMENT", "off"),
        ]);
        assert!(!config.scheduling.require_payment);
    }

    #[test]
    fn email_recipients_fall_back_to_admin_email() {
        let config = apply(&[("ADMIN_EMAIL", "Owner@Example.com")]);
        assert_eq!(config.email.to, vec!["owner@example.com".to_string()]);

        let config = apply(&[("EMAIL_TO", " a@example.com, ,b@example.com "), ("ADMIN_EMAIL", "c@example.com")]);
        assert_eq!(config.email.to, vec!["a@example.com".to_string(), "b@example.com".to_string()]);
    }

    #[test]
    fn email_settings_are_normalised() {
        let config = apply(&[
            ("EMAIL_PROVIDER", "RESEND"),
            ("EMAIL_SUBJECT_PREFIX", "  My   Site "),
            ("EMAIL_SEND_CUSTOMERS", "no"),
        ]);
        assert_eq!(config.email.provider, EmailProvider::Resend);
        assert_eq!(config.email.subject_prefix, "My Site");
        assert!(!config.email.send_customer_emails);

        assert_eq!(apply(&[("EMAIL_PROVIDER", "smtp")]).email.provider, EmailProvider::Log);
    }

    #[test]
    fn scheduling_comes_from_resolver() {
        let config = apply(&[("CALL_AVAILABILITY_MODE", "manual"), ("CALL_SLOT_STEP_MINUTES", "1")]);
        assert_eq!(config.scheduling.availability_mode, AvailabilityMode::Manual);
        assert_eq!(config.scheduling.step_minutes, 5);
    }

    #[test]
    fn pool_size_is_clamped() {
        assert_eq!(apply(&[("CALLSLOT_DB_POOL_SIZE", "0")]).database.pool_size, 1);
        assert_eq!(apply(&[("CALLSLOT_DB_POOL_SIZE", "junk")]).database.pool_size, 8);
    }

    #[test]
    fn toml_file_supplies_sections() {
        let mut file = Builder::new().suffix(".toml").tempfile().expect("temp file");
        writeln!(
            file,
            "[database]\npath = \"/var/lib/callslot.db\"\n\n[payments]\nkey_id = \"rzp_file\"\nkey_secret = \"file_secret\"\n\n[admin]\ntoken = \"t0k\""
        )
        .expect("write");

        let base = load_from_file(Some(file.path().to_path_buf())).expect("parsed");
        assert_eq!(base.database.path, "/var/lib/callslot.db");

        let config = load_with(base, |_| None);
        assert!(config.scheduling.require_payment);
        assert_eq!(config.admin.token.as_deref(), Some("t0k"));
    }

    #[test]
    fn json_file_and_errors() {
        let mut file = Builder::new().suffix(".json").tempfile().expect("temp file");
        write!(file, "{{\"server\": {{\"bind_addr\": \"127.0.0.1:9000\"}}}}").expect("write");
        let config = load_from_file(Some(file.path().to_path_buf())).expect("parsed");
        assert_eq!(config.server.bind_addr, "127.0.0.1:9000");

        let mut bad = Builder::new().suffix(".json").tempfile().expect("temp file");
        write!(bad, "not json").expect("write");
        assert!(matches!(load_from_file(Some(bad.path().to_path_buf())), Err(CallSlotError::Config(_))));

        assert!(load_from_file(Some(PathBuf::from("/definitely/missing.toml"))).is_err());
    }
}
