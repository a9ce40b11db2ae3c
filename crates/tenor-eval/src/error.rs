//! Evaluation errors.
//!
//! Only fatal conditions are errors. Degenerate cross-sections, short
//! aggregation windows and assets without future prices are reported as `NaN`
//! outputs or exclusion counts and never abort a run.

use tenor_data::DataError;
use thiserror::Error;

/// Result type for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Fatal evaluation errors.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Invalid or conflicting run parameters, raised before any processing
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Panel construction failed
    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

impl EvalError {
    /// Shorthand for a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
