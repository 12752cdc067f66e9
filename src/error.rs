//! Error types for the layout engine.

use std::sync::Arc;

use thiserror::Error;

/// Result type alias for layout operations.
pub type Result<T> = std::result::Result<T, OptimizationError>;

/// Failures of a layout computation.
///
/// Unplaced plants and deadline overruns are not errors: they come back as a
/// `Partial` layout carrying `LayoutWarning` tags.
#[derive(Debug, Error)]
pub enum OptimizationError {
    /// Garden, zone, plant or parameter values outside their accepted range.
    /// Raised before any work starts and never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A spacing computation was handed an unusable value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A zone task panicked or the worker pool shut down.
    #[error("Zone worker failed: {0}")]
    Worker(String),

    /// The computation behind a cache slot failed. Every caller waiting on
    /// that slot receives the same shared error.
    #[error("Layout computation failed: {0}")]
    CacheComputation(Arc<OptimizationError>),
}

impl OptimizationError {
    /// True for errors caused by the caller's input rather than the engine.
    pub fn is_input_error(&self) -> bool {
        match self {
            OptimizationError::InvalidInput(_) | OptimizationError::InvalidParameter(_) => true,
            OptimizationError::CacheComputation(inner) => inner.is_input_error(),
            OptimizationError::Worker(_) => false,
        }
    }
}

/// Errors raised while reading process configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}
