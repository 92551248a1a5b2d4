//! HTTP error mapping for command handlers.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use callslot_domain::CallSlotError;
use serde::Serialize;
use tracing::error;

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(CallSlotError),
    #[error("{0}")]
    BadRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Domain(err) => status_for(err),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<CallSlotError> for ApiError {
    fn from(err: CallSlotError) -> Self {
        Self::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Status code for each error category.
pub fn status_for(err: &CallSlotError) -> StatusCode {
    match err {
        CallSlotError::Validation(_) | CallSlotError::PaymentIntegrity(_) => StatusCode::BAD_REQUEST,
        CallSlotError::Conflict(_) => StatusCode::CONFLICT,
        CallSlotError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
        CallSlotError::ProviderUnavailable(_) => StatusCode::NOT_IMPLEMENTED,
        CallSlotError::NotFound(_) => StatusCode::NOT_FOUND,
        CallSlotError::Database(_)
        | CallSlotError::Config(_)
        | CallSlotError::Network(_)
        | CallSlotError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn client_message(err: &CallSlotError) -> String {
    match err {
        CallSlotError::Validation(m)
        | CallSlotError::Conflict(m)
        | CallSlotError::PaymentIntegrity(m)
        | CallSlotError::PaymentRequired(m)
        | CallSlotError::ProviderUnavailable(m)
        | CallSlotError::NotFound(m)
        | CallSlotError::Network(m) => m.clone(),
        // Storage and config details stay in the log.
        CallSlotError::Database(_) | CallSlotError::Config(_) | CallSlotError::Internal(_) => {
            "Internal server error".to_string()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Domain(err) => {
                if status.is_server_error() {
                    error!(error = %err, "request failed");
                }
                client_message(err)
            }
            Self::BadRequest(_) | Self::Unauthorized => self.to_string(),
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
