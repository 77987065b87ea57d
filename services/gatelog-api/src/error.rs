//! HTTP error envelope shared by middleware and handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gatelog_core::CoreError;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Body written for every rejected request:
/// `{"error": {"code": 401, "message": "...", "status": "Unauthorized"}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    pub status: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// Credentials or the origin header are missing.
    Unauthorized(String),
    /// The caller is identified but not allowed.
    Forbidden(String),
    /// Malformed caller input.
    Validation(String),
    /// Anything raised by the core crates.
    Core(CoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(err) => match err {
                CoreError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
                CoreError::StorageError(_) | CoreError::AlreadyExists { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                CoreError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                CoreError::Context { .. }
                | CoreError::InvalidPattern { .. }
                | CoreError::SerializationError(_)
                | CoreError::DeserializationError(_)
                | CoreError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Core(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Unauthorized(msg) | ApiError::Forbidden(msg) | ApiError::Validation(msg) => {
                msg
            }
            ApiError::Core(err) => {
                if status.is_server_error() {
                    error!(status = %status, error = %err, "request failed");
                }
                err.to_string()
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: status.as_u16(),
                message,
                status: status.canonical_reason().unwrap_or("Unknown").to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}
