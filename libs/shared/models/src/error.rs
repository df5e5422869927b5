use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error surface of every HTTP handler. The body is always `{"error": msg}`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A booking the clinic's rules do not allow (closed, full, duplicate).
    /// The message is shown to the patient as is.
    #[error("{0}")]
    BookingRejected(String),

    /// The hosted data store failed or answered with something unreadable.
    #[error("Database error: {0}")]
    Database(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::BookingRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match self {
            AppError::Auth(msg)
            | AppError::NotFound(msg)
            | AppError::ValidationError(msg)
            | AppError::BookingRejected(msg)
            | AppError::Database(msg) => msg,
        };

        if status.is_server_error() {
            tracing::error!("{}: {}", status, message);
        } else {
            tracing::debug!("Request rejected: {}: {}", status, message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
