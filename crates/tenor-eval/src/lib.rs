//! Cross-sectional factor evaluation.
//!
//! Aligns a factor panel with forward returns, then measures how well the
//! factor ranks assets: per-timestamp information coefficients (Pearson and
//! Spearman), quantile backtests with a long-short spread, summary statistics
//! and IC decay over horizons or delays.
//!
//! Every stage borrows read-only panels and returns new values. Degenerate
//! cross-sections never abort a run; they surface as `NaN` points.
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tenor/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod aggregate;
pub mod align;
pub mod backtest;
pub mod config;
pub mod decay;
pub mod error;
pub mod ic;
pub mod preprocess;
pub mod summary;

pub use aggregate::{aggregate_panel, aggregate_with_config};
pub use align::{AlignedCrossSection, Exclusions, align};
pub use backtest::{
    QuantileAssignment, QuantileBacktest, ReturnPoint, bucket_returns, quantile_backtest, stratify,
};
pub use config::{
    AggregationConfig, AlignmentConfig, BacktestConfig, EvalConfig, PerformanceConfig,
    PreprocessConfig, ReturnKind, RunParameters, SortDirection, Winsorize,
};
pub use decay::{
    DecayAxis, DecayCurve, DecayPoint, DecayRunner, DecayStatistic, decay_over_delays,
    decay_over_horizons,
};
pub use error::{EvalError, Result};
pub use ic::{IcPoint, IcSeries, cross_section_ic, ic_series};
pub use preprocess::{preprocess, standardize, winsorize};
pub use summary::{ExpectedSign, IcSummary, monotonicity};
