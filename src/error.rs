// Error handling module
// Defines transformation, storage and HTTP error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::resolver::Provider;

/// Failures of a remote transformation.
///
/// `Display` is the user-facing message surfaced in `TransformationResult::Failure`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// Blank input, rejected before any network call
    #[error("Please provide some input text to transform.")]
    EmptyInput,

    /// A required credential is not configured
    #[error("{} API key is not configured. Please add it in API settings.", .0.display_name())]
    MissingCredential(Provider),

    /// Non-2xx response from the provider
    #[error("{message}")]
    Upstream {
        provider: Provider,
        status: u16,
        message: String,
    },

    /// Network failure (timeout, DNS, connection reset)
    #[error("Network error contacting {}: {message} (kind: {kind})", .provider.display_name())]
    Transport {
        provider: Provider,
        kind: &'static str,
        message: String,
    },

    /// 2xx response without usable content
    #[error("No content received from {} API", .0.display_name())]
    EmptyContent(Provider),

    /// Request could not be built
    #[error("Failed to build request: {0}")]
    Request(String),
}

impl TransformError {
    /// Coarse class used in logs
    pub fn class(&self) -> &'static str {
        match self {
            TransformError::EmptyInput | TransformError::MissingCredential(_) => "validation",
            TransformError::Upstream { .. }
            | TransformError::Transport { .. }
            | TransformError::Request(_) => "transport",
            TransformError::EmptyContent(_) => "contract",
        }
    }
}

/// Persistence errors from the SQLite stores
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid value: {0}")]
    Invalid(String),

    #[error("Failed to prepare storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// API errors that can occur during request processing
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Request validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage failure
    #[error("Storage error: {0}")]
    Store(StoreError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::Invalid(msg) => ApiError::ValidationError(msg),
            other => ApiError::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::AuthError(msg) => (StatusCode::UNAUTHORIZED, "auth_error", msg),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Store(err) => {
                tracing::error!("Storage error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_error",
                    err.to_string(),
                )
            }
            ApiError::Internal(err) => {
                // Log internal errors
                tracing::error!("Internal error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "type": error_type,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
