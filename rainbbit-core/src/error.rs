//! Error types for RAINBBIT operations

use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Query failed on {operation}: {reason}")]
    QueryFailed { operation: String, reason: String },

    #[error("Insert failed for record {dt}: {reason}")]
    InsertFailed { dt: i64, reason: String },

    #[error("Unknown column: {column}")]
    UnknownColumn { column: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors for caller-supplied input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown measure: {measure}")]
    UnknownMeasure { measure: String },

    #[error("Too many measures: requested {requested}, at most {max} allowed")]
    TooManyMeasures { requested: usize, max: usize },

    #[error("No measures requested")]
    NoMeasures,

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors. Fatal at startup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Errors raised while pulling an observation from the upstream weather API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("Request to {source_name} failed: {reason}")]
    RequestFailed { source_name: String, reason: String },

    #[error("Request to {source_name} returned status {status}")]
    BadStatus { source_name: String, status: u16 },

    #[error("Invalid response from {source_name}: {reason}")]
    InvalidResponse { source_name: String, reason: String },
}

/// Chart rendering errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("Render failed for {chart}: {reason}")]
    Failed { chart: String, reason: String },
}

/// Master error type for all RAINBBIT errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RainbbitError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// Result type alias for RAINBBIT operations.
pub type RainbbitResult<T> = Result<T, RainbbitError>;

// =============================================================================
// TESTS
// =============================================================================
