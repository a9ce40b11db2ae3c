//! Error types for panel construction and loading.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while building or loading panels.
#[derive(Debug, Error)]
pub enum DataError {
    /// Timestamps are not strictly ascending
    #[error("Timestamps must be strictly ascending: {previous} is followed by {next}")]
    UnsortedTimestamps {
        /// Timestamp seen first
        previous: String,
        /// Timestamp that broke the ordering
        next: String,
    },

    /// The same asset identifier appears twice in a panel
    #[error("Duplicate asset identifier: {0}")]
    DuplicateAsset(String),

    /// The same (timestamp, asset) pair was supplied twice
    #[error("Duplicate observation for {asset} at {timestamp}")]
    DuplicateObservation {
        /// Asset identifier
        asset: String,
        /// Timestamp of the observation
        timestamp: String,
    },

    /// Value matrix shape does not match the axes
    #[error("Shape mismatch: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    ShapeMismatch {
        /// Number of timestamps
        expected_rows: usize,
        /// Number of assets
        expected_cols: usize,
        /// Rows in the supplied matrix
        rows: usize,
        /// Columns in the supplied matrix
        cols: usize,
    },

    /// A timestamp string could not be parsed
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Required column is missing or has an unsupported type
    #[error("Column {name}: {reason}")]
    Column {
        /// Column name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
