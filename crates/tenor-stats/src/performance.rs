//! Return-series performance statistics.
//!
//! Used for the long-short spread and per-bucket return series of a quantile
//! backtest. `NaN` periods (timestamps whose cross-section was degenerate) are
//! skipped by every statistic and treated as flat in the equity curve.

use crate::moments::{mean, sample_std};
use serde::{Deserialize, Serialize};

/// Compounded equity curve starting from 1.0, one point per period.
///
/// A `NaN` period leaves the curve unchanged.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    let mut equity = 1.0;
    returns
        .iter()
        .map(|r| {
            if r.is_finite() {
                equity *= 1.0 + r;
            }
            equity
        })
        .collect()
}

/// Largest peak-to-trough loss of an equity curve, as a positive fraction.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst: f64 = 0.0;
    for &value in equity {
        peak = peak.max(value);
        if peak > 0.0 {
            worst = worst.max((peak - value) / peak);
        }
    }
    worst
}

/// Summary statistics of a periodic return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    /// Number of finite periods used
    pub periods: usize,
    /// Mean period return
    pub mean_return: f64,
    /// Compounded total return
    pub total_return: f64,
    /// Geometric annualised return
    pub annualized_return: f64,
    /// Annualised volatility (sample std × √periods_per_year)
    pub annualized_volatility: f64,
    /// Annualised mean excess return over annualised volatility
    pub sharpe_ratio: f64,
    /// Annualised mean excess return over annualised downside deviation
    pub sortino_ratio: f64,
    /// Maximum drawdown of the compounded curve
    pub max_drawdown: f64,
    /// Annualised return over maximum drawdown
    pub calmar_ratio: f64,
    /// Fraction of periods with a positive return
    pub win_rate: f64,
    /// Mean gain of winning periods over mean loss of losing periods
    pub profit_loss_ratio: f64,
}

impl PerformanceStats {
    /// Compute statistics for a return series sampled `periods_per_year`
    /// times a year, with excess returns measured against an annual
    /// `risk_free_rate`.
    ///
    /// Ratios whose denominator is zero or undefined are `NaN`.
    pub fn from_returns(returns: &[f64], periods_per_year: u32, risk_free_rate: f64) -> Self {
        let finite: Vec<f64> = returns.iter().copied().filter(|r| r.is_finite()).collect();
        let n = finite.len();
        if n == 0 {
            return Self {
                periods: 0,
                mean_return: f64::NAN,
                total_return: f64::NAN,
                annualized_return: f64::NAN,
                annualized_volatility: f64::NAN,
                sharpe_ratio: f64::NAN,
                sortino_ratio: f64::NAN,
                max_drawdown: f64::NAN,
                calmar_ratio: f64::NAN,
                win_rate: f64::NAN,
                profit_loss_ratio: f64::NAN,
            };
        }

        let per_year = f64::from(periods_per_year);
        let mean_return = mean(&finite);
        let excess_per_year = (mean_return - risk_free_rate / per_year) * per_year;
        let growth: f64 = finite.iter().map(|r| 1.0 + r).product();
        let annualized_return = growth.powf(per_year / n as f64) - 1.0;
        let annualized_volatility = sample_std(&finite) * per_year.sqrt();

        let losses: Vec<f64> = finite.iter().copied().filter(|r| *r < 0.0).collect();
        let downside_deviation = sample_std(&losses) * per_year.sqrt();
        let drawdown = max_drawdown(&cumulative_returns(&finite));

        Self {
            periods: n,
            mean_return,
            total_return: growth - 1.0,
            annualized_return,
            annualized_volatility,
            sharpe_ratio: ratio(excess_per_year, annualized_volatility),
            sortino_ratio: ratio(excess_per_year, downside_deviation),
            max_drawdown: drawdown,
            calmar_ratio: ratio(annualized_return, drawdown),
            win_rate: finite.iter().filter(|r| **r > 0.0).count() as f64 / n as f64,
            profit_loss_ratio: profit_loss_ratio(&finite),
        }
    }
}

/// `numerator / denominator`, or `NaN` unless the denominator is positive.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        f64::NAN
    }
}

fn profit_loss_ratio(returns: &[f64]) -> f64 {
    let gains: Vec<f64> = returns.iter().copied().filter(|r| *r > 0.0).collect();
    let losses: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    if losses.is_empty() {
        return f64::NAN;
    }
    let mean_gain = if gains.is_empty() { 0.0 } else { mean(&gains) };
    ratio(mean_gain, -mean(&losses))
}
