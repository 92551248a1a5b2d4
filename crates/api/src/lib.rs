//! # CallSlot API
//!
//! HTTP layer - routes, handlers and the application context.
//!
//! This crate contains:
//! - axum handlers (HTTP → core services bridge)
//! - Application context (dependency injection)
//! - Logging bootstrap and the binary entry point
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture
//! - Admin routes sit behind a bearer token and are only mounted when one is
//!   configured

pub mod commands;
pub mod context;
pub mod error;
pub mod utils;

use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::{from_fn, from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::Router;
use tracing::{debug, warn};

use crate::commands::{admin_calls, calls, health, refunds};
pub use crate::context::AppContext;
pub use crate::error::{ApiError, ApiResult};
use crate::utils::auth::{require_admin, AdminToken};

/// Build the full router for `ctx`.
pub fn build_router(ctx: Arc<AppContext>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health::get_health))
        .route("/calls/availability", get(calls::get_availability))
        .route("/calls/book", post(calls::book_call))
        .route("/calls/checkout", post(calls::create_checkout))
        .route("/calls/checkout/verify", post(calls::verify_checkout))
        .route("/refunds", post(refunds::submit_refund));

    match ctx.admin_token() {
        Some(token) => {
            let admin = Router::new()
                .route("/admin/calls", get(admin_calls::list_bookings))
                .route("/admin/calls/{id}/status", patch(admin_calls::update_booking_status))
                .route("/admin/refunds", get(refunds::list_refunds))
                .route("/admin/refunds/{id}/approve", post(refunds::approve_refund))
                .route("/admin/refunds/{id}/reject", post(refunds::reject_refund))
                .route_layer(from_fn_with_state(AdminToken(Arc::from(token)), require_admin));
            router = router.merge(admin);
        }
        None => warn!("CALLSLOT_ADMIN_TOKEN is not set; admin routes are disabled"),
    }

    router.layer(from_fn(request_log_middleware)).with_state(ctx)
}

async fn request_log_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    debug!(%method, %path, status = response.status().as_u16(), "http_request");
    response
}
