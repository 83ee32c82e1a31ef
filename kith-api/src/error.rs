//! Error Types for the Kith API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! Every error leaves the server as `{ "error": message, "code": CODE,
//! "details": ... }`. Server-side failures are reported and their message is
//! replaced before the body is written.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kith_core::ValidationErrors;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_postgres::error::SqlState;

/// Message sent in place of any 5xx error's own message.
pub const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Request Errors (400)
    // ========================================================================
    /// A path id is not a UUID
    InvalidId,

    /// The request body is not well-formed JSON for the target shape
    InvalidBody,

    /// The body or query string failed validation
    ValidationFailed,

    // ========================================================================
    // Authentication Errors (401, 403)
    // ========================================================================
    /// Request lacks valid authentication credentials
    Unauthorized,

    /// Authentication token is invalid or malformed
    InvalidToken,

    /// Authentication token has expired
    TokenExpired,

    /// Request is authenticated but lacks permission for the resource
    Forbidden,

    // ========================================================================
    // Not Found / Conflict (404, 409)
    // ========================================================================
    /// Requested resource does not exist or belongs to another user
    NotFound,

    /// Unique constraint or state conflict
    Conflict,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Anything the client cannot act on
    Internal,

    /// A dependency (usually the database) is unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidId | ErrorCode::InvalidBody | ErrorCode::ValidationFailed => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::Unauthorized | ErrorCode::InvalidToken | ErrorCode::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidId => "Invalid id",
            ErrorCode::InvalidBody => "Invalid request body",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::InvalidToken => "Invalid authentication token",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::Forbidden => "Access forbidden",
            ErrorCode::NotFound => "Not found",
            ErrorCode::Conflict => "Conflict",
            ErrorCode::Internal => GENERIC_INTERNAL_MESSAGE,
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
        }
    }

    /// Wire name, as serialized in the `code` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidId => "INVALID_ID",
            ErrorCode::InvalidBody => "INVALID_BODY",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::Internal => "INTERNAL",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// API error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable error message
    #[serde(rename = "error")]
    pub message: String,

    /// Error code for programmatic handling
    pub code: ErrorCode,

    /// Optional additional details (e.g. `{"fields": [...]}`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience Constructors
    // ========================================================================

    pub fn invalid_id(param: &str, raw: &str) -> Self {
        Self::new(ErrorCode::InvalidId, format!("'{}' is not a valid {}", raw, param))
    }

    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidBody, message)
    }

    /// Validation failure carrying every field error under `details.fields`.
    pub fn validation(errors: ValidationErrors) -> Self {
        let details = serde_json::json!({ "fields": errors.fields });
        Self::from_code(ErrorCode::ValidationFailed).with_details(details)
    }

    /// Validation failure for a single field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::validation(ValidationErrors::single(field, message))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    pub fn token_expired() -> Self {
        Self::from_code(ErrorCode::TokenExpired)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Resource absent or owned by someone else; both read the same.
    pub fn not_found(entity: &str) -> Self {
        Self::new(ErrorCode::NotFound, format!("{} not found", entity))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// The body actually sent to the client.
    fn public_body(&self) -> ApiError {
        if self.code.is_server_error() {
            ApiError::from_code(self.code)
        } else {
            self.clone()
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let Ok(metrics) = crate::telemetry::METRICS.as_ref() {
            metrics.record_api_error(self.code.as_str());
        }
        if self.code.is_server_error() {
            tracing::error!(code = ?self.code, message = %self.message, "Request failed");
            crate::reporting::capture(&self);
        }
        (status, Json(self.public_body())).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM OTHER ERROR TYPES
// ============================================================================

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::validation(errors)
    }
}

impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let code = db_err.code();
            if *code == SqlState::UNIQUE_VIOLATION {
                return ApiError::conflict(conflict_message(db_err.constraint()));
            }
            if *code == SqlState::FOREIGN_KEY_VIOLATION {
                return ApiError::new(ErrorCode::NotFound, "Referenced resource not found");
            }
        }
        tracing::error!(error = %err, "Database error");
        ApiError::internal_error(format!("Database error: {}", err))
    }
}

impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        tracing::error!(error = %err, "Connection pool error");
        match err {
            deadpool_postgres::PoolError::Timeout(_) => {
                ApiError::internal_error("Database connection pool exhausted")
            }
            deadpool_postgres::PoolError::Closed => {
                ApiError::internal_error("Database connection pool is closed")
            }
            _ => ApiError::internal_error(format!("Failed to get database connection: {}", err)),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "Migration connection error");
        ApiError::internal_error(format!("Database error: {}", err))
    }
}

impl From<sqlx::migrate::MigrateError> for ApiError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        tracing::error!(error = %err, "Migration failed");
        ApiError::internal_error(format!("Migration failed: {}", err))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_body(format!("Invalid JSON: {}", err))
    }
}

/// Client-facing message for a unique violation, keyed by constraint name.
fn conflict_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("friends_owner_contact_key") => "A friend already exists for this contact",
        Some("friends_owner_self_key") => "A self friend already exists",
        Some("circles_owner_id_name_key") => "A circle with this name already exists",
        Some("collective_memberships_collective_id_friend_id_key") => {
            "Friend is already a member of this collective"
        }
        Some("users_email_key") => "A user with this email already exists",
        _ => "Resource already exists",
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// TESTS
// ============================================================================
