use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::enhancement::orchestrator::SubmitError;
use crate::enhancement::session::GENERATION_FAILURE_MESSAGE;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid payload: {0}")]
    Payload(String),

    /// Cause already logged by the orchestrator; never sent to the client.
    #[error("Generation failed")]
    Generation,
}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Validation => AppError::Validation(err.to_string()),
            SubmitError::Busy => AppError::Conflict(err.to_string()),
            SubmitError::Generation(_) => AppError::Generation,
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Payload(err.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            AppError::Payload(msg) => {
                tracing::warn!("Rejected payload: {msg}");
                (StatusCode::BAD_REQUEST, "PAYLOAD_ERROR", msg)
            }
            AppError::Generation => (
                StatusCode::BAD_GATEWAY,
                "GENERATION_ERROR",
                GENERATION_FAILURE_MESSAGE.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
