//! Storyteller API — error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use storyteller_narration::domain::errors::TurnError;
use thiserror::Error;
use tracing::error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Tracing or exporter setup failed.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
pub const FORBIDDEN_MESSAGE: &str = "Forbidden";
pub const USER_NOT_FOUND_MESSAGE: &str = "User not found in database";
pub const QUOTA_EXCEEDED_MESSAGE: &str =
    "You have exceeded your maximum number of messages for the day! Please try again later.";
pub const INVALID_REQUEST_MESSAGE: &str = "Invalid request";
pub const INTERNAL_ERROR_MESSAGE: &str = "An error occurred while processing your request!";

/// HTTP-layer wrapper around `TurnError` that implements `IntoResponse`.
///
/// Turn failures are answered with a plain-text body.
#[derive(Debug)]
pub struct ApiError(pub TurnError);

impl From<TurnError> for ApiError {
    fn from(err: TurnError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            TurnError::Unauthorized => (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE),
            TurnError::Forbidden => (StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE),
            TurnError::UserNotFound => (StatusCode::NOT_FOUND, USER_NOT_FOUND_MESSAGE),
            TurnError::QuotaExceeded { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, QUOTA_EXCEEDED_MESSAGE)
            }
            TurnError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, INVALID_REQUEST_MESSAGE),
            TurnError::NoAssistantMessage
            | TurnError::Generation(_)
            | TurnError::Model(_)
            | TurnError::Store(_)
            | TurnError::IllegalTransition { .. } => {
                error!(error = %self.0, "turn failed");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
            }
        };

        (status, message).into_response()
    }
}

/// JSON body returned for synthesis errors.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub error: &'static str,
}

/// Failures of the text-to-speech endpoint.
#[derive(Debug, Error)]
pub enum SynthesisApiError {
    #[error("Text parameter is required")]
    MissingText,

    #[error("storyId parameter is required")]
    MissingStoryId,

    #[error("Failed to generate audio")]
    Failed,
}

impl IntoResponse for SynthesisApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingText => (StatusCode::BAD_REQUEST, "Text parameter is required"),
            Self::MissingStoryId => (StatusCode::BAD_REQUEST, "storyId parameter is required"),
            Self::Failed => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate audio"),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
