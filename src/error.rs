//! Error types for the storage core, the shortening service and the HTTP layer.
//!
//! - [`StorageError`] - failures raised by repositories and schema backends
//! - [`ShortenError`] - failures surfaced by [`crate::application::services::ShorteningService`]
//! - [`AppError`] - HTTP-facing error rendered as a JSON body

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

/// Result type for repository and schema operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Failures of the storage layer, shared by every backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Bad alphabet, code length, table prefix or database name.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("storage backend unreachable: {0}")]
    Connectivity(String),

    /// A unique constraint rejected the write. Expected under concurrent inserts.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("storage query failed: {0}")]
    Query(String),

    #[error("stored data is invalid: {0}")]
    InvalidData(String),

    #[error("migration '{migration}' failed: {reason}")]
    MigrationApply { migration: String, reason: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl StorageError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Wraps a failure raised while a migration was being applied.
    pub fn migration(migration: impl Into<String>, source: &StorageError) -> Self {
        Self::MigrationApply {
            migration: migration.into(),
            reason: source.to_string(),
        }
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey(_))
    }
}

/// Failures of the shortening service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShortenError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("no free short code found after {attempts} attempts")]
    CodeSpaceExhausted { attempts: usize },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

/// Machine-readable error payload.
#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

/// Errors returned by HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    Validation { message: String, details: Value },
    NotFound { message: String, details: Value },
    Unavailable { message: String, details: Value },
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn unavailable(message: impl Into<String>, details: Value) -> Self {
        Self::Unavailable {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    fn parts(self) -> (StatusCode, &'static str, String, Value) {
        match self {
            AppError::Validation { message, details } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message,
                details,
            ),
            AppError::NotFound { message, details } => {
                (StatusCode::NOT_FOUND, "not_found", message, details)
            }
            AppError::Unavailable { message, details } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                message,
                details,
            ),
            AppError::Internal { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                message,
                details,
            ),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            AppError::Validation { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Unavailable { message, .. }
            | AppError::Internal { message, .. } => message,
        };
        f.write_str(message)
    }
}

impl From<ShortenError> for AppError {
    fn from(err: ShortenError) -> Self {
        match err {
            ShortenError::InvalidUrl(reason) => {
                AppError::bad_request("Invalid URL format", json!({ "reason": reason }))
            }
            ShortenError::CodeSpaceExhausted { attempts } => AppError::internal(
                "Failed to generate unique code",
                json!({ "attempts": attempts }),
            ),
            ShortenError::Storage(StorageError::Connectivity(_)) => {
                AppError::unavailable("Storage backend unavailable", json!({}))
            }
            ShortenError::Storage(_) => AppError::internal("Storage error", json!({})),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::bad_request(
            "Request validation failed",
            serde_json::to_value(errors.field_errors()).unwrap_or(Value::Null),
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();

        let body = ErrorBody {
            error: ErrorInfo {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}
