//! Summary statistics of IC series and backtests.
//!
//! Reductions are sequential over the ordered series so the same input always
//! gives bit-identical output.

use crate::backtest::QuantileBacktest;
use crate::ic::IcSeries;
use serde::{Deserialize, Serialize};
use std::fmt;
use tenor_stats::moments::{mean, sample_std};
use tenor_stats::spearman;

/// Sign the factor is expected to have, used as the reference for win rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedSign {
    /// Higher factor values should precede higher returns
    Positive,
    /// Higher factor values should precede lower returns
    Negative,
}

impl ExpectedSign {
    /// Sign of a value, `None` for zero or non-finite input.
    pub fn of(value: f64) -> Option<Self> {
        if value > 0.0 {
            Some(Self::Positive)
        } else if value < 0.0 {
            Some(Self::Negative)
        } else {
            None
        }
    }

    fn matches(self, value: f64) -> bool {
        match self {
            Self::Positive => value > 0.0,
            Self::Negative => value < 0.0,
        }
    }
}

/// Aggregate statistics of an IC series.
///
/// Every statistic is computed over the defined points only; `NaN` means the
/// statistic itself is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IcSummary {
    /// Points in the series
    pub total: usize,
    /// Defined points
    pub valid: usize,
    /// Mean IC
    pub mean: f64,
    /// Sample standard deviation of the IC (n-1)
    pub std: f64,
    /// Mean over standard deviation
    pub icir: f64,
    /// Fraction of defined points sharing the reference sign
    pub win_rate: f64,
    /// Fraction of defined points above zero
    pub positive_ratio: f64,
    /// Smallest IC
    pub min: f64,
    /// Largest IC
    pub max: f64,
    /// `mean / (std / sqrt(valid))`
    pub t_stat: f64,
}

impl IcSummary {
    /// Summarise an IC series, using the sign of the mean IC for win rate.
    pub fn from_series(series: &IcSeries) -> Self {
        Self::from_values(&series.values(), None)
    }

    /// Summarise an IC series against an expected sign.
    pub fn with_reference_sign(series: &IcSeries, sign: ExpectedSign) -> Self {
        Self::from_values(&series.values(), Some(sign))
    }

    /// Summarise raw IC values. `NaN` entries count towards `total` only.
    pub fn from_values(values: &[f64], reference: Option<ExpectedSign>) -> Self {
        let valid: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let n = valid.len();
        let mean_ic = mean(&valid);
        let std = sample_std(&valid);

        let icir = if std > 0.0 { mean_ic / std } else { f64::NAN };
        let t_stat = if std > 0.0 {
            mean_ic / (std / (n as f64).sqrt())
        } else {
            f64::NAN
        };

        let win_rate = match reference.or_else(|| ExpectedSign::of(mean_ic)) {
            Some(sign) if n > 0 => valid.iter().filter(|v| sign.matches(**v)).count() as f64 / n as f64,
            _ => f64::NAN,
        };
        let positive_ratio = if n > 0 {
            valid.iter().filter(|v| **v > 0.0).count() as f64 / n as f64
        } else {
            f64::NAN
        };
        let (min, max) = if n > 0 {
            valid.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            })
        } else {
            (f64::NAN, f64::NAN)
        };

        Self {
            total: values.len(),
            valid: n,
            mean: mean_ic,
            std,
            icir,
            win_rate,
            positive_ratio,
            min,
            max,
            t_stat,
        }
    }
}

impl fmt::Display for IcSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Periods:        {} ({} valid)", self.total, self.valid)?;
        writeln!(f, "  Mean IC:        {:.4}", self.mean)?;
        writeln!(f, "  IC Std:         {:.4}", self.std)?;
        writeln!(f, "  ICIR:           {:.4}", self.icir)?;
        writeln!(f, "  t-stat:         {:.2}", self.t_stat)?;
        writeln!(f, "  Win rate:       {:.2}%", self.win_rate * 100.0)?;
        writeln!(f, "  Positive IC:    {:.2}%", self.positive_ratio * 100.0)?;
        write!(f, "  Range:          [{:.4}, {:.4}]", self.min, self.max)
    }
}

/// Spearman correlation between bucket index and time-averaged bucket return.
///
/// +1 means returns rise strictly with the bucket index. Uses a minimum count
/// of 2 so a two-bucket backtest is defined; `NaN` if any bucket average is
/// undefined or all averages are equal.
pub fn monotonicity(backtest: &QuantileBacktest) -> f64 {
    let means = backtest.mean_bucket_returns();
    let index: Vec<f64> = (0..means.len()).map(|i| i as f64).collect();
    spearman(&index, &means, 2)
}
