//! Run configuration.
//!
//! Every derived series carries a [`RunParameters`] snapshot of the settings
//! that produced it, so results can be reproduced from the same panels.

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tenor_stats::{AggregationMethod, CorrelationMethod, DEFAULT_MIN_COUNT};

/// How forward returns are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    /// `p[exit] / p[entry] - 1`
    #[default]
    Simple,
    /// `ln p[exit] - ln p[entry]`
    Log,
}

impl fmt::Display for ReturnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Simple => "simple",
            Self::Log => "log",
        })
    }
}

/// Ranking direction for quantile buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Bucket 0 holds the lowest factor values
    #[default]
    Ascending,
    /// Bucket 0 holds the highest factor values
    Descending,
}

/// Alignment of factor observations with forward returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Price-axis steps between signal and entry (default: 0)
    pub delay: usize,
    /// Price-axis steps between entry and exit (default: 1)
    pub horizon: usize,
    /// Forward return form (default: simple)
    pub return_kind: ReturnKind,
    /// Minimum assets for a usable cross-section (default: 3)
    pub min_cross_section: usize,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            delay: 0,
            horizon: 1,
            return_kind: ReturnKind::Simple,
            min_cross_section: DEFAULT_MIN_COUNT,
        }
    }
}

impl AlignmentConfig {
    /// Check the parameters before any processing.
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(EvalError::config("horizon must be positive"));
        }
        if self.min_cross_section < 2 {
            return Err(EvalError::config(format!(
                "minimum cross-section size must be at least 2, got {}",
                self.min_cross_section
            )));
        }
        Ok(())
    }
}

/// Quantile backtest settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Number of quantile buckets Q (default: 5)
    pub buckets: usize,
    /// Ranking direction (default: ascending)
    pub direction: SortDirection,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            buckets: 5,
            direction: SortDirection::Ascending,
        }
    }
}

impl BacktestConfig {
    /// Check the parameters before any processing.
    pub fn validate(&self) -> Result<()> {
        if self.buckets < 2 {
            return Err(EvalError::config(format!(
                "bucket count must be at least 2, got {}",
                self.buckets
            )));
        }
        Ok(())
    }
}

/// Cross-sectional outlier treatment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum Winsorize {
    /// Clip to mean ± `n_std` sample standard deviations
    Std {
        /// Width of the band in standard deviations
        n_std: f64,
    },
    /// Clip to the `lower` and `upper` quantiles
    Quantile {
        /// Lower quantile in [0, 1)
        lower: f64,
        /// Upper quantile in (lower, 1]
        upper: f64,
    },
}

/// Per-timestamp factor preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Outlier clipping applied first (default: none)
    pub winsorize: Option<Winsorize>,
    /// Cross-sectional z-scoring applied second (default: false)
    pub standardize: bool,
}

impl PreprocessConfig {
    /// Whether any step is enabled.
    pub const fn is_enabled(&self) -> bool {
        self.winsorize.is_some() || self.standardize
    }

    /// Check the parameters before any processing.
    pub fn validate(&self) -> Result<()> {
        match self.winsorize {
            Some(Winsorize::Std { n_std }) if !(n_std.is_finite() && n_std > 0.0) => Err(
                EvalError::config(format!("winsorize n_std must be positive, got {n_std}")),
            ),
            Some(Winsorize::Quantile { lower, upper })
                if !(0.0 <= lower && lower < upper && upper <= 1.0) =>
            {
                Err(EvalError::config(format!(
                    "winsorize quantiles must satisfy 0 <= lower < upper <= 1, got {lower}..{upper}"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Sub-period aggregation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Statistic used to collapse each window
    pub method: AggregationMethod,
    /// Window length before each evaluation timestamp, in seconds
    pub lookback_seconds: i64,
}

impl AggregationConfig {
    /// Check the parameters before any processing.
    pub fn validate(&self) -> Result<()> {
        if self.lookback_seconds <= 0 {
            return Err(EvalError::config(format!(
                "aggregation lookback must be positive, got {}s",
                self.lookback_seconds
            )));
        }
        Ok(())
    }
}

/// Annualisation settings for return statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Evaluation periods per year (default: 252)
    pub periods_per_year: u32,
    /// Annual risk-free rate subtracted in Sharpe and Sortino (default: 0.03)
    pub risk_free_rate: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            periods_per_year: 252,
            risk_free_rate: 0.03,
        }
    }
}

impl PerformanceConfig {
    /// Check the parameters before any processing.
    pub fn validate(&self) -> Result<()> {
        if self.periods_per_year == 0 {
            return Err(EvalError::config("periods per year must be positive"));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(EvalError::config(format!(
                "risk-free rate must be finite, got {}",
                self.risk_free_rate
            )));
        }
        Ok(())
    }
}

/// Complete evaluation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Alignment settings
    pub alignment: AlignmentConfig,
    /// Quantile backtest settings
    pub backtest: BacktestConfig,
    /// Primary correlation method, used by decay analysis (default: pearson)
    pub correlation: CorrelationMethod,
    /// Factor preprocessing
    pub preprocess: PreprocessConfig,
    /// Sub-period aggregation, required when evaluating raw readings
    pub aggregation: Option<AggregationConfig>,
    /// Return statistics
    pub performance: PerformanceConfig,
}

impl EvalConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.alignment.validate()?;
        self.backtest.validate()?;
        self.preprocess.validate()?;
        if let Some(aggregation) = &self.aggregation {
            aggregation.validate()?;
        }
        self.performance.validate()
    }

    /// Snapshot of the parameters stored on derived series.
    pub fn run_parameters(&self) -> RunParameters {
        RunParameters {
            delay: self.alignment.delay,
            horizon: self.alignment.horizon,
            return_kind: self.alignment.return_kind,
            min_cross_section: self.alignment.min_cross_section,
            aggregation: self.aggregation.map(|a| a.method),
            buckets: self.backtest.buckets,
        }
    }
}

/// Parameters that produced a derived series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunParameters {
    /// Signal-to-entry delay in price steps
    pub delay: usize,
    /// Holding horizon in price steps
    pub horizon: usize,
    /// Forward return form
    pub return_kind: ReturnKind,
    /// Minimum cross-section size
    pub min_cross_section: usize,
    /// Sub-period aggregation method, if the factor was aggregated
    pub aggregation: Option<AggregationMethod>,
    /// Quantile bucket count
    pub buckets: usize,
}

impl fmt::Display for RunParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "delay={} horizon={} returns={} min_size={} buckets={}",
            self.delay, self.horizon, self.return_kind, self.min_cross_section, self.buckets
        )?;
        if let Some(method) = self.aggregation {
            write!(f, " aggregation={method}")?;
        }
        Ok(())
    }
}

impl FromStr for ReturnKind {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "log" => Ok(Self::Log),
            other => Err(EvalError::config(format!("unknown return kind: {other}"))),
        }
    }
}
