//! Error types for the barangay portal
//!
//! Every lifecycle operation returns `Result<T, AppError>`. The HTTP
//! boundary wraps that result in an [`ActionResult`], which always renders
//! the uniform `{"success": bool, "data" | "error"}` envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Referenced record does not exist (404)
    #[error("{0} not found")]
    NotFound(String),

    /// Required field missing or malformed (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Write would overwrite data that must be kept (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Status change not allowed by the entity's transition table (409)
    #[error("Cannot change {entity} status from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// SQLite error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored document could not be read back or written (500)
    #[error("Store error: {0}")]
    Store(String),

    /// Object storage error (500)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Outbound push/email failure. Only ever logged by the dispatcher.
    #[error("Notification error: {0}")]
    Notification(String),

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

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

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Store(format!("malformed document: {}", err))
    }
}

impl AppError {
    /// Shorthand for a missing record of the given kind
    pub fn not_found(entity: &str, id: &str) -> Self {
        AppError::NotFound(format!("{} {}", entity, id))
    }

    /// HTTP status, user-facing message and metric label
    ///
    /// Internal variants never expose their detail to the caller.
    fn classify(&self) -> (StatusCode, String, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string(), "not_found"),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "validation"),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone(), "conflict"),
            AppError::InvalidTransition { .. } => {
                (StatusCode::CONFLICT, self.to_string(), "invalid_transition")
            }
            AppError::HttpClient(_) => (
                StatusCode::BAD_GATEWAY,
                "Upstream service unavailable".to_string(),
                "http_client",
            ),
            AppError::Database(_) | AppError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to access records. Please try again.".to_string(),
                "store",
            ),
            AppError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store the uploaded file".to_string(),
                "storage",
            ),
            AppError::Notification(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to send notification".to_string(),
                "notification",
            ),
            AppError::Config(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "internal",
            ),
        }
    }

    /// Message safe to show to the caller
    pub fn public_message(&self) -> String {
        self.classify().1
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, error_type) = self.classify();

        if status.is_server_error() {
            tracing::error!(error = %self, error_type, "Operation failed");
        } else {
            tracing::debug!(error = %self, error_type, "Operation rejected");
        }

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = Json(Envelope::<()>::failure(error_message));
        (status, body).into_response()
    }
}

/// Uniform operation envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Outermost result of a public operation
///
/// Handlers return this so that every failure, including store errors,
/// is normalized into the envelope rather than escaping as a 500 page.
pub struct ActionResult<T>(pub Result<T, AppError>);

impl<T> From<Result<T, AppError>> for ActionResult<T> {
    fn from(result: Result<T, AppError>) -> Self {
        Self(result)
    }
}

impl<T: Serialize> IntoResponse for ActionResult<T> {
    fn into_response(self) -> Response {
        match self.0 {
            Ok(data) => (StatusCode::OK, axum::Json(Envelope::success(data))).into_response(),
            Err(error) => error.into_response(),
        }
    }
}
