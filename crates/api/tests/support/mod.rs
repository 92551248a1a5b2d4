//! Shared helpers for `callslot-api` router tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use callslot_api::{build_router, AppContext};
use callslot_core::Clock;
use callslot_domain::{resolve_scheduling_config, AppConfig, AdminConfig, DatabaseConfig, PaymentConfig};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_TOKEN: &str = "s3cret-admin";
pub const KEY_ID: &str = "rzp_test_key";
pub const KEY_SECRET: &str = "shh";

pub fn utc(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, minute, 0).single().expect("valid instant")
}

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self { now: Mutex::new(now) })
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().expect("clock lock") += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

/// Options for building a test application.
#[derive(Default)]
pub struct TestOptions {
    pub env: Vec<(&'static str, String)>,
    pub admin_token: bool,
    /// Razorpay base URL; keys are configured when set.
    pub payments_base: Option<String>,
    pub disable_housekeeping: bool,
}

pub struct TestApp {
    pub router: Router,
    pub ctx: Arc<AppContext>,
    pub clock: Arc<FixedClock>,
    _temp_dir: TempDir,
}

impl TestApp {
    /// Free bookings, admin routes mounted, clock at 2025-03-01 12:00 UTC.
    pub fn free() -> Self {
        Self::build(TestOptions { admin_token: true, ..TestOptions::default() })
    }

    pub fn build(options: TestOptions) -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");

        let mut env = options.env;
        let payments = match options.payments_base {
            Some(api_base) => {
                env.push(("RAZORPAY_KEY_ID", KEY_ID.to_string()));
                env.push(("RAZORPAY_KEY_SECRET", KEY_SECRET.to_string()));
                PaymentConfig {
                    key_id: Some(KEY_ID.to_string()),
                    key_secret: Some(KEY_SECRET.to_string()),
                    api_base,
                }
            }
            None => PaymentConfig::default(),
        };
        let scheduling = resolve_scheduling_config(|key| {
            env.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone())
        });

        let mut config = AppConfig {
            database: DatabaseConfig {
                path: temp_dir.path().join("callslot.db").to_string_lossy().to_string(),
                pool_size: 4,
            },
            payments,
            admin: AdminConfig { token: options.admin_token.then(|| ADMIN_TOKEN.to_string()) },
            scheduling,
            ..AppConfig::default()
        };
        config.email.to = vec!["owner@example.com".to_string()];
        config.housekeeping.enabled = !options.disable_housekeeping;

        let clock = FixedClock::at(utc(1, 12, 0));
        let ctx = Arc::new(AppContext::with_clock(config, clock.clone()).expect("context should build"));
        let router = build_router(Arc::clone(&ctx));
        Self { router, ctx, clock, _temp_dir: temp_dir }
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_with_token(method, uri, body, None).await
    }

    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_with_token(method, uri, body, Some(ADMIN_TOKEN)).await
    }

    pub async fn send_with_token(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        let response = self.router.clone().oneshot(request).await.expect("router should respond");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body should be readable");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, json)
    }
}

pub fn booking_body(start_at: &str, duration: u32) -> Value {
    json!({
        "startAt": start_at,
        "durationMinutes": duration,
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "topic": "Rust",
        "title": "Architecture review"
    })
}
