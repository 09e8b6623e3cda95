//! Error types for data object operations

use thiserror::Error;

/// Record store errors.
///
/// Raised by store drivers for backend faults. The persistence layer never
/// catches or translates these; they propagate to the caller unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store backend error: {reason}")]
    Backend { reason: String },

    #[error("Unknown collection: {collection}")]
    UnknownCollection { collection: String },
}

/// Cache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend error: {reason}")]
    Backend { reason: String },

    #[error("Invalid cached payload at {key}: {reason}")]
    InvalidPayload { key: String, reason: String },
}

/// Master error type for all data object operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataObjectError {
    #[error("Property not found: {name}")]
    PropertyNotFound { name: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Result type alias for data object operations.
pub type DataObjectResult<T> = Result<T, DataObjectError>;

// =============================================================================
// TESTS
// =============================================================================
