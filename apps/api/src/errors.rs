use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::inventory::InventoryError;
use crate::posting::IntakeError;
use crate::storage::StorageError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Per-requirement and per-candidate problems never become an `AppError`;
/// they are recorded in the analysis report instead. A bad ruleset stops the
/// process at startup, so it never reaches a handler either.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Intake(IntakeError::InvalidUrl(url)) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("'{url}' is not a valid http(s) url"),
            ),
            AppError::Intake(e @ (IntakeError::Pdf(_) | IntakeError::Empty)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INTAKE_ERROR",
                e.to_string(),
            ),
            AppError::Intake(e) => {
                tracing::warn!("Posting intake failed: {e}");
                (StatusCode::BAD_GATEWAY, "INTAKE_ERROR", e.to_string())
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
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
