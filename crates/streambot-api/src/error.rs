//! Streambot API — API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use streambot_adventure::domain::errors::AdventureError;
use streambot_core::error::DomainError;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Story catalog or initial settings could not be loaded.
    #[error("startup error: {0}")]
    Startup(#[from] DomainError),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `AdventureError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub AdventureError);

impl From<AdventureError> for ApiError {
    fn from(err: AdventureError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(AdventureError::Domain(err))
    }
}

fn domain_status(err: &DomainError) -> (StatusCode, &'static str) {
    match err {
        DomainError::UserNotFound(_) => (StatusCode::NOT_FOUND, "user_not_found"),
        DomainError::InsufficientBalance { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_balance")
        }
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        DomainError::Configuration(_) => (StatusCode::SERVICE_UNAVAILABLE, "configuration_error"),
        DomainError::Infrastructure(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            AdventureError::InvalidBet => (StatusCode::BAD_REQUEST, "invalid_bet"),
            AdventureError::RoundInProgress => (StatusCode::CONFLICT, "round_in_progress"),
            AdventureError::AlreadyJoined(_) => (StatusCode::CONFLICT, "already_joined"),
            AdventureError::IllegalTransition { .. } | AdventureError::Render(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            AdventureError::Domain(err) => domain_status(err),
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
