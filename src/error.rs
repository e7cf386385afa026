//! Error types for the OAuth backend
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.
//! Response bodies only ever carry a generic message; upstream
//! details stay in the server log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// No access token in the session (401)
    #[error("Not authenticated")]
    Unauthorized,

    /// OAuth state missing or not matching the stored one (400)
    #[error("Invalid state token")]
    InvalidState,

    /// Validation error (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authorization code exchange failed (500)
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// Identity provider API error (500)
    #[error("Provider error: {0}")]
    Provider(String),

    /// OS random number generator failure (500)
    #[error("Randomness unavailable: {0}")]
    Randomness(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Session load or save failed (500)
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        AppError::Session(err.to_string())
    }
}

impl From<tower_sessions::session_store::Error> for AppError {
    fn from(err: tower_sessions::session_store::Error) -> Self {
        AppError::Session(err.to_string())
    }
}

impl AppError {
    /// HTTP status, public message and metric label for this error
    fn parts(&self) -> (StatusCode, String, &'static str) {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string(), "not_found"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string(), "unauthorized"),
            AppError::InvalidState => (StatusCode::BAD_REQUEST, self.to_string(), "invalid_state"),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "validation"),
            AppError::TokenExchange(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to exchange token".to_string(),
                "token_exchange",
            ),
            AppError::Provider(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch profile".to_string(),
                "provider",
            ),
            AppError::Randomness(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate state token".to_string(),
                "randomness",
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
                "database",
            ),
            AppError::Session(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "session",
            ),
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error".to_string(),
                "config",
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "internal",
            ),
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to an HTTP status code and a
    /// `{"error": ...}` JSON body. Server errors are logged with
    /// their full detail before the generic body is returned.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, error_type) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = %self, error_type, "Request failed");
        } else {
            tracing::debug!(error = %self, error_type, "Request rejected");
        }

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
