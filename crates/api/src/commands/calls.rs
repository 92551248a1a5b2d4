//! Public call-booking commands

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use callslot_core::{BookingRequest, VerifyRequest};
use callslot_domain::{AvailabilityReport, Booking, VerifiedCheckout};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::ApiResult;
use crate::utils::command_helpers::execute_command;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub duration_minutes: Option<String>,
    pub days: Option<String>,
}

/// Lenient integer parsing for query strings: `"60"`, `" 60 "` and `"60.0"`
/// are accepted, anything else is `None`.
fn parse_int(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim();
    raw.parse::<i64>().ok().or_else(|| {
        let float = raw.parse::<f64>().ok().filter(|f| f.is_finite())?;
        #[allow(clippy::cast_possible_truncation)]
        Some(float.trunc() as i64)
    })
}

fn to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// `GET /calls/availability?durationMinutes=30&days=7`
///
/// Unsupported durations produce an empty grid, not an error.
pub async fn get_availability(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<Json<AvailabilityReport>> {
    execute_command("calls::availability", async {
        let duration = parse_int(query.duration_minutes.as_deref()).map_or(0, to_u32);
        let days = parse_int(query.days.as_deref()).map(to_u32);
        Ok(Json(ctx.availability.availability(duration, days).await?))
    })
    .await
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub booking: Booking,
}

/// `POST /calls/book`: free booking, 402 when payment is required.
pub async fn book_call(
    State(ctx): State<Arc<AppContext>>,
    body: Result<Json<BookingRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<BookingResponse>)> {
    execute_command("calls::book", async {
        let Json(request) = body?;
        let booking = ctx.bookings.book_free(&request).await?;
        Ok((StatusCode::CREATED, Json(BookingResponse { booking })))
    })
    .await
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutHandle {
    pub id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// What the browser needs to open the provider's payment widget.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCheckout {
    pub key_id: String,
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub checkout: CheckoutHandle,
    pub razorpay: ProviderCheckout,
    pub time_zone: String,
}

/// `POST /calls/checkout`: hold the slot and open a provider order.
pub async fn create_checkout(
    State(ctx): State<Arc<AppContext>>,
    body: Result<Json<BookingRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CheckoutResponse>)> {
    execute_command("calls::checkout", async {
        let Json(request) = body?;
        let session = ctx.checkout.initiate(&request).await?;
        let response = CheckoutResponse {
            checkout: CheckoutHandle { id: session.checkout_id, expires_at: session.hold_expires_at },
            razorpay: ProviderCheckout {
                key_id: session.key_id,
                order_id: session.order_id,
                amount: session.amount,
                currency: session.currency,
            },
            time_zone: session.time_zone,
        };
        Ok((StatusCode::CREATED, Json(response)))
    })
    .await
}

/// `POST /calls/checkout/verify`: idempotent on the same payment.
pub async fn verify_checkout(
    State(ctx): State<Arc<AppContext>>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult<Json<VerifiedCheckout>> {
    execute_command("calls::verify", async {
        let Json(request) = body?;
        let proof = request.into_proof()?;
        Ok(Json(ctx.checkout.verify(&proof).await?))
    })
    .await
}
