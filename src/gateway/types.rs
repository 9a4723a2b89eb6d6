//! HTTP response types and error mapping

use crate::error::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

/// API error detail
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.to_string(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn partial_flush(delivered: usize, failed: &[String]) -> Self {
        let mut error = Self::new(
            "PARTIAL_FLUSH",
            format!("{} digests delivered, {} failed", delivered, failed.len()),
        );
        error.error.details = Some(serde_json::json!({
            "delivered": delivered,
            "failed": failed,
        }));
        error
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Error::PartialFlush { delivered, failed } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::partial_flush(*delivered, failed),
            ),
            e if e.is_client_error() => {
                (StatusCode::BAD_REQUEST, ApiError::bad_request(e.to_string()))
            }
            e => {
                tracing::error!("Request failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal(e.to_string()))
            }
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
