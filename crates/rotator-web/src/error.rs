//! Error types for the rotator web service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rotation::RotationError;
use thiserror::Error;

/// Errors that can occur while serving a request.
#[derive(Debug, Error)]
pub enum WebError {
    /// Rotation failure.
    #[error(transparent)]
    Rotation(#[from] RotationError),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            WebError::Rotation(err @ RotationError::GroupNotFound(_)) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            WebError::Rotation(err @ RotationError::NoActiveAgents(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            // Already logged with its fields by the dispatcher.
            WebError::Rotation(RotationError::SelectionInvariant { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            WebError::Rotation(err) => {
                tracing::error!("Rotation error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for handlers.
pub type Result<T> = std::result::Result<T, WebError>;
