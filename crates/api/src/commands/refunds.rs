//! Refund request intake and admin processing

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use callslot_core::{ProviderRefund, RefundIntake, RefundPage};
use callslot_domain::{CallSlotError, RefundRequest};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::{ApiError, ApiResult};
use crate::utils::command_helpers::execute_command;

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub request: RefundRequest,
}

#[derive(Debug, Serialize)]
pub struct ApprovedRefund {
    pub request: RefundRequest,
    pub refund: ProviderRefund,
}

fn refund_id(raw: &str) -> Result<Uuid, CallSlotError> {
    Uuid::parse_str(raw.trim()).map_err(|_| CallSlotError::NotFound("Refund request not found".into()))
}

/// `POST /refunds`
pub async fn submit_refund(
    State(ctx): State<Arc<AppContext>>,
    body: Result<Json<RefundIntake>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RefundResponse>)> {
    execute_command("refunds::submit", async {
        let Json(intake) = body?;
        let request = ctx.refunds.submit(&intake).await?;
        Ok((StatusCode::CREATED, Json(RefundResponse { request })))
    })
    .await
}

#[derive(Debug, Default, Deserialize)]
pub struct RefundListQuery {
    pub status: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
}

/// `GET /admin/refunds?status=requested&limit=50&skip=0`
pub async fn list_refunds(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<RefundListQuery>,
) -> ApiResult<Json<RefundPage>> {
    execute_command("admin_refunds::list", async {
        let RefundListQuery { status, limit, skip } = query;
        Ok(Json(ctx.refunds.list(status.as_deref(), limit, skip).await?))
    })
    .await
}

/// `POST /admin/refunds/{id}/approve`
pub async fn approve_refund(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApprovedRefund>> {
    execute_command("admin_refunds::approve", async {
        let (request, refund) = ctx.refunds.approve(refund_id(&id)?).await?;
        Ok(Json(ApprovedRefund { request, refund }))
    })
    .await
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectBody {
    pub note: Option<String>,
}

/// `POST /admin/refunds/{id}/reject` with an optional `{"note": "..."}`
pub async fn reject_refund(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<RefundResponse>> {
    execute_command("admin_refunds::reject", async {
        let RejectBody { note } = if body.iter().all(u8::is_ascii_whitespace) {
            RejectBody::default()
        } else {
            serde_json::from_slice(&body).map_err(|err| ApiError::bad_request(format!("Invalid JSON body: {err}")))?
        };
        let request = ctx.refunds.reject(refund_id(&id)?, note).await?;
        Ok(Json(RefundResponse { request }))
    })
    .await
}
