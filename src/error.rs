//! Request-level error taxonomy and its HTTP mapping.
//!
//! Handlers return [`AppResult`] and let `?` propagate; the mapping to a
//! response happens once, here. Validation and inference failures carry a
//! user-visible plain-text message for the form flow; decode failures
//! answer in JSON because the soil route speaks JSON; database failures are
//! logged and surfaced as 500 instead of being dropped.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

// ---

/// Message shown when form input fails parsing or range checks.
pub const INVALID_FORM_MSG: &str =
    "Sorry... there was an error in the entered values. Please check the form and fill it again.";

/// Message shown when the tabular model's output cannot be resolved to a crop.
pub const UNKNOWN_CROP_MSG: &str =
    "Sorry, we could not determine the best crop to be cultivated with the provided data.";

#[derive(Debug, Error)]
pub enum AppError {
    // ---
    /// Bad or out-of-range form input; rejected before any model call.
    #[error("{0}")]
    Validation(String),

    /// Model produced an id or label outside the known set.
    #[error("inference failed: {0}")]
    Inference(String),

    /// Uploaded image data could not be decoded.
    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unexpected internal failure outside the other categories.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    // ---
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::Inference(detail) => {
                tracing::warn!("inference failure: {}", detail);
                (StatusCode::UNPROCESSABLE_ENTITY, UNKNOWN_CROP_MSG).into_response()
            }
            AppError::Decode(detail) => {
                tracing::warn!("rejected upload: {}", detail);
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "could not decode the uploaded image" })),
                )
                    .into_response()
            }
            AppError::Database(e) => {
                tracing::error!("database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            AppError::Internal(detail) => {
                tracing::error!("internal error: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}
