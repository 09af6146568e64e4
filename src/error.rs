//! Error types for simstats
//!
//! Only conditions that a retry cannot fix live here. Per-cell problems
//! (missing counters, zero denominators) are data, see [`crate::Unavailable`].

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// simstats error types
#[derive(Error, Debug)]
pub enum Error {
    /// A rule definition is malformed (arity, duplicate name, bad regex, ...)
    #[error("Invalid rule '{rule}': {reason}\nFix the rule definition and reload the registry.")]
    InvalidRule {
        /// Name of the offending rule (may be empty)
        rule: String,
        /// What is wrong with it
        reason: String,
    },

    /// A metric was requested that the registry does not define
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// Raw stats text could not be parsed
    #[error("Stats parse error: {0}")]
    ParseError(String),

    /// Storage error (Parquet/Arrow export)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (rule table / dataset) error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build an [`Error::InvalidRule`].
    #[must_use]
    pub fn invalid_rule(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule: rule.into(),
            reason: reason.into(),
        }
    }
}
