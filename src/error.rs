//! Error types for ledger-insight
//!
//! Every variant names the field or value at fault so the presentation layer can
//! show an actionable message instead of an empty chart.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// ledger-insight error types
#[derive(Error, Debug)]
pub enum Error {
    /// Input record rejected by its schema
    #[error("Validation failed for field '{field}': {constraint}")]
    Validation {
        /// Offending field name
        field: String,
        /// Violated constraint, human readable
        constraint: String,
    },

    /// Predicate, aggregation or regression references an unknown or ill-typed field
    #[error("Schema mismatch on field '{field}': {reason}")]
    SchemaMismatch {
        /// Referenced field name
        field: String,
        /// Why the reference is invalid
        reason: String,
    },

    /// Durable medium unreadable or unwritable
    #[error("Storage error: {0}")]
    Storage(String),

    /// Regression preconditions not met (too few samples, degenerate data)
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Feature vector arity differs from the fitted model
    #[error("Dimension mismatch: model expects {expected} feature(s), got {actual}")]
    DimensionMismatch {
        /// Number of features the model was fitted on
        expected: usize,
        /// Number of values supplied
        actual: usize,
    },

    /// Reduction undefined for the given input (e.g. mean of an empty set)
    #[error("Computation error: {0}")]
    Computation(String),

    /// Malformed query input or configuration
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::Validation`] for `field`
    pub fn validation(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
        }
    }

    /// Build a [`Error::SchemaMismatch`] for `field`
    pub fn schema_mismatch(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
