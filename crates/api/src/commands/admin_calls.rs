//! Admin booking commands

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use callslot_domain::{BookingListing, BookingStatus, BookingView, CallSlotError};
use serde::Deserialize;
use uuid::Uuid;

use super::calls::BookingResponse;
use crate::context::AppContext;
use crate::error::{ApiError, ApiResult};
use crate::utils::command_helpers::execute_command;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub view: Option<String>,
    pub status: Option<String>,
}

impl ListQuery {
    /// Anything but `all` means upcoming; an unknown status is ignored.
    fn filters(&self) -> (BookingView, Option<BookingStatus>) {
        let view = match self.view.as_deref().map(str::parse::<BookingView>) {
            Some(Ok(BookingView::All)) => BookingView::All,
            _ => BookingView::Upcoming,
        };
        let status = self.status.as_deref().and_then(|s| s.parse().ok());
        (view, status)
    }
}

/// `GET /admin/calls?view=upcoming|all&status=scheduled`
pub async fn list_bookings(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<BookingListing>> {
    execute_command("admin_calls::list", async {
        let (view, status) = query.filters();
        Ok(Json(ctx.bookings.list_bookings(view, status).await?))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

/// `PATCH /admin/calls/{id}/status` with `{"status": "completed" | "cancelled"}`
pub async fn update_booking_status(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> ApiResult<Json<BookingResponse>> {
    execute_command("admin_calls::update_status", async {
        let Json(update) = body?;
        let next = update
            .status
            .as_deref()
            .and_then(|s| s.parse::<BookingStatus>().ok())
            .ok_or_else(|| ApiError::bad_request("Invalid status"))?;
        let id = Uuid::parse_str(id.trim()).map_err(|_| CallSlotError::NotFound("Booking not found".into()))?;
        let booking = ctx.bookings.update_status(id, next).await?;
        Ok(Json(BookingResponse { booking }))
    })
    .await
}
