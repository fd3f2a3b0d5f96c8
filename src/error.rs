//! Error types for store and configuration operations.
//!
//! The solver itself never fails; these errors come from editing the
//! timeline or loading configuration.

use thiserror::Error;

/// Errors raised by [`Timeline`](crate::models::Timeline) edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("duplicate item ID: {0}")]
    DuplicateItem(String),

    #[error("duplicate constraint ID: {0}")]
    DuplicateConstraint(String),

    #[error("unknown item: {0}")]
    UnknownItem(String),

    #[error("unknown constraint: {0}")]
    UnknownConstraint(String),

    #[error("constraint '{0}' has no item A")]
    MissingItemA(String),

    #[error("constraint '{id}' of type '{kind}' requires item B")]
    MissingItemB { id: String, kind: String },

    #[error("time value out of range for item '{0}'")]
    TimeOverflow(String),

    #[error("item '{id}' has start {start_ms} after end {end_ms}")]
    ReversedInterval {
        id: String,
        start_ms: i64,
        end_ms: i64,
    },
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
