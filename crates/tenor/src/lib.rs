//! Tenor: cross-sectional factor evaluation.
//!
//! Measures how well a factor signal predicts the cross-section of forward
//! returns. Given a factor panel and a price panel, [`FactorEvaluation`]
//! aligns the two, computes Pearson and Spearman information coefficients per
//! timestamp, runs a quantile backtest and summarises both into an
//! [`EvaluationReport`].
//!
//! ```no_run
//! use tenor::{EvalConfig, FactorEvaluation, FactorPanel, PriceKind, PricePanel};
//!
//! let factor = FactorPanel::from_csv_path("funding_rates.csv")?;
//! let prices = PricePanel::from_csv_path("prices.csv", PriceKind::Price)?;
//! let report = FactorEvaluation::new(EvalConfig::default()).run(&factor, &prices)?;
//! println!("{report}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tenor/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod evaluation;
pub mod report;

// Re-export main types from sub-crates
pub use tenor_data as data;
pub use tenor_eval as eval;
pub use tenor_stats as stats;

pub use evaluation::FactorEvaluation;
pub use report::{BacktestReport, EvaluationReport, IcReport, ReportError};
pub use tenor_data::{FactorPanel, PriceKind, PricePanel, SubPeriodPanel, Timestamp};
pub use tenor_eval::{EvalConfig, EvalError};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
