//! Error Types for RAINBBIT API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rainbbit_core::{ConfigError, RainbbitError, StorageError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

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
    // Validation Errors (400)
    // ========================================================================
    /// Request contains invalid input data
    InvalidInput,

    /// A requested measure is not stored
    UnknownMeasure,

    /// More measures were requested than a projection allows
    TooManyMeasures,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested resource does not exist
    NotFound,

    // ========================================================================
    // Throttling Errors (429, 503)
    // ========================================================================
    /// The client exceeded its own request quota
    TooManyRequests,

    /// The service as a whole is over its request budget
    ServiceBusy,

    // ========================================================================
    // Server Errors (500)
    // ========================================================================
    /// Measurement store operation failed
    StorageError,

    /// Chart rendering failed
    RenderError,

    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput | ErrorCode::UnknownMeasure | ErrorCode::TooManyMeasures => {
                StatusCode::BAD_REQUEST
            }

            ErrorCode::NotFound => StatusCode::NOT_FOUND,

            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::ServiceBusy => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::StorageError | ErrorCode::RenderError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::UnknownMeasure => "Unknown measure",
            ErrorCode::TooManyMeasures => "Too many measures requested",
            ErrorCode::NotFound => "Not found",
            ErrorCode::TooManyRequests => "Too many requests",
            ErrorCode::ServiceBusy => "Server busy",
            ErrorCode::StorageError => "Storage operation failed",
            ErrorCode::RenderError => "Chart rendering failed",
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a NotFound error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Create a TooManyRequests error.
    pub fn too_many_requests(retry_after_secs: u64) -> Self {
        Self::from_code(ErrorCode::TooManyRequests)
            .with_details(serde_json::json!({ "retry_after_secs": retry_after_secs }))
    }

    /// Create a ServiceBusy error.
    pub fn service_busy(retry_after_secs: u64) -> Self {
        Self::from_code(ErrorCode::ServiceBusy)
            .with_details(serde_json::json!({ "retry_after_secs": retry_after_secs }))
    }

    /// Seconds the client should wait, for throttling errors.
    fn retry_after_secs(&self) -> Option<u64> {
        match self.code {
            ErrorCode::TooManyRequests | ErrorCode::ServiceBusy => self
                .details
                .as_ref()
                .and_then(|d| d.get("retry_after_secs"))
                .and_then(|v| v.as_u64()),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Throttling errors also carry a `Retry-After` header.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = self.retry_after_secs();
        let mut response = (status, Json(self)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let code = match &err {
            ValidationError::UnknownMeasure { .. } => ErrorCode::UnknownMeasure,
            ValidationError::TooManyMeasures { .. } => ErrorCode::TooManyMeasures,
            ValidationError::NoMeasures | ValidationError::InvalidValue { .. } => {
                ErrorCode::InvalidInput
            }
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        // Log the full error, return a generic one
        tracing::error!(error = %err, "Storage error");
        ApiError::from_code(ErrorCode::StorageError)
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        tracing::error!(error = %err, "Configuration error");
        ApiError::internal_error(err.to_string())
    }
}

/// Convert from the domain error taxonomy.
impl From<RainbbitError> for ApiError {
    fn from(err: RainbbitError) -> Self {
        match err {
            RainbbitError::Validation(e) => e.into(),
            RainbbitError::Storage(e) => e.into(),
            RainbbitError::Config(e) => e.into(),
            RainbbitError::Render(e) => {
                tracing::error!(error = %e, "Render error");
                ApiError::from_code(ErrorCode::RenderError)
            }
            RainbbitError::Ingest(e) => {
                tracing::error!(error = %e, "Ingest error");
                ApiError::internal_error("Upstream weather source failed")
            }
        }
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
