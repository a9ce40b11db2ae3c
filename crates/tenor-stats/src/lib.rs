//! Numeric kernels for the Tenor factor evaluation engine.
//!
//! Pure functions over slices: sub-period aggregation, fractional ranking,
//! Pearson and Spearman correlation, descriptive moments and return-series
//! performance statistics. Undefined results are `NaN`, never zero.
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tenor/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod aggregate;
pub mod correlation;
pub mod moments;
pub mod performance;
pub mod rank;

pub use aggregate::{AggregationMethod, UnknownAggregation, aggregate, aggregate_window};
pub use correlation::{
    CorrelationMethod, DEFAULT_MIN_COUNT, Undefined, UnknownCorrelation, correlate, pearson,
    spearman, try_pearson, try_spearman,
};
pub use performance::{PerformanceStats, cumulative_returns, max_drawdown};
pub use rank::fractional_rank;
