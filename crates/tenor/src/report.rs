//! Evaluation reports.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tenor_eval::{IcSeries, IcSummary, QuantileBacktest, RunParameters};
use tenor_stats::{CorrelationMethod, PerformanceStats};
use thiserror::Error;

/// Errors that can occur while writing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// IC series together with its summary.
#[derive(Debug, Clone, Serialize)]
pub struct IcReport {
    /// Per-timestamp IC
    pub series: IcSeries,
    /// Aggregate statistics
    pub summary: IcSummary,
    /// Running sum of the IC
    pub cumulative: Vec<f64>,
}

impl IcReport {
    /// Summarise a series.
    pub fn new(series: IcSeries) -> Self {
        let summary = IcSummary::from_series(&series);
        let cumulative = series.cumulative();
        Self {
            series,
            summary,
            cumulative,
        }
    }

    /// Correlation method of the series.
    pub const fn method(&self) -> CorrelationMethod {
        self.series.method()
    }
}

/// Quantile backtest with derived statistics.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    /// Per-timestamp bucket returns
    pub backtest: QuantileBacktest,
    /// Time-averaged return per bucket
    pub mean_bucket_returns: Vec<f64>,
    /// Spearman correlation of bucket index with mean bucket return
    pub monotonicity: f64,
    /// Return statistics of the long-short spread
    pub long_short: PerformanceStats,
    /// Return statistics of each bucket
    pub buckets: Vec<PerformanceStats>,
}

/// Complete output of one factor evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    /// Report generation time
    pub generated_at: DateTime<Utc>,
    /// Parameters used for alignment and bucketing
    pub params: RunParameters,
    /// Evaluation timestamps in the factor panel
    pub periods: usize,
    /// Assets in the factor panel
    pub assets: usize,
    /// Cross-sections at or above the minimum size
    pub usable_cross_sections: usize,
    /// Pearson IC
    pub ic: IcReport,
    /// Spearman rank IC
    pub rank_ic: IcReport,
    /// Quantile backtest
    pub backtest: BacktestReport,
}

impl EvaluationReport {
    /// Convert the report to a JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as JSON to a file.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str("\nFactor Evaluation\n");
        output.push_str(&format!("Parameters: {}\n", self.params));
        output.push_str(&format!(
            "Universe: {} periods x {} assets ({} usable cross-sections)\n",
            self.periods, self.assets, self.usable_cross_sections
        ));
        output.push_str(&"=".repeat(72));
        output.push('\n');

        output.push_str(&format!("{:<16} {:>12} {:>12}\n", "", "IC", "Rank IC"));
        output.push_str(&"-".repeat(72));
        output.push('\n');
        let rows: [(&str, f64, f64); 7] = [
            ("Mean", self.ic.summary.mean, self.rank_ic.summary.mean),
            ("Std", self.ic.summary.std, self.rank_ic.summary.std),
            ("ICIR", self.ic.summary.icir, self.rank_ic.summary.icir),
            ("t-stat", self.ic.summary.t_stat, self.rank_ic.summary.t_stat),
            ("Win rate", self.ic.summary.win_rate, self.rank_ic.summary.win_rate),
            ("Min", self.ic.summary.min, self.rank_ic.summary.min),
            ("Max", self.ic.summary.max, self.rank_ic.summary.max),
        ];
        for (label, ic, rank_ic) in rows {
            output.push_str(&format!("{label:<16} {ic:>12.4} {rank_ic:>12.4}\n"));
        }
        output.push_str(&format!(
            "{:<16} {:>12} {:>12}\n",
            "Valid", self.ic.summary.valid, self.rank_ic.summary.valid
        ));

        let backtest = &self.backtest;
        output.push_str(&format!(
            "\nQuantile Backtest ({} buckets, {:?}):\n",
            backtest.backtest.buckets(),
            backtest.backtest.direction()
        ));
        output.push_str(&"-".repeat(72));
        output.push('\n');
        output.push_str(&format!(
            "{:<8} {:>12} {:>12} {:>12} {:>12}\n",
            "Bucket", "Mean ret", "Total ret", "Sharpe", "Max DD"
        ));
        for (i, (mean, stats)) in backtest
            .mean_bucket_returns
            .iter()
            .zip(&backtest.buckets)
            .enumerate()
        {
            output.push_str(&format!(
                "{:<8} {:>11.4}% {:>11.2}% {:>12.2} {:>11.2}%\n",
                i + 1,
                mean * 100.0,
                stats.total_return * 100.0,
                stats.sharpe_ratio,
                stats.max_drawdown * 100.0
            ));
        }
        let ls = &backtest.long_short;
        output.push_str(&format!(
            "{:<8} {:>11.4}% {:>11.2}% {:>12.2} {:>11.2}%\n",
            "L-S",
            ls.mean_return * 100.0,
            ls.total_return * 100.0,
            ls.sharpe_ratio,
            ls.max_drawdown * 100.0
        ));
        output.push_str(&format!("\nMonotonicity:   {:.4}\n", backtest.monotonicity));
        output.push_str(&format!(
            "L-S annualised: {:.2}% return, {:.2}% volatility, {:.2}% win rate\n",
            ls.annualized_return * 100.0,
            ls.annualized_volatility * 100.0,
            ls.win_rate * 100.0
        ));
        output.push_str(&format!(
            "L-S ratios:     Sortino {:.2}, Calmar {:.2}, profit/loss {:.2}\n",
            ls.sortino_ratio, ls.calmar_ratio, ls.profit_loss_ratio
        ));
        output.push_str(&"=".repeat(72));
        output.push('\n');

        output
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Factor Evaluation ({})", self.params)?;
        writeln!(f, "IC ({}):", self.ic.method())?;
        writeln!(f, "{}", self.ic.summary)?;
        writeln!(f, "Rank IC ({}):", self.rank_ic.method())?;
        writeln!(f, "{}", self.rank_ic.summary)?;
        writeln!(
            f,
            "Long-short: mean {:.4}%, Sharpe {:.2}, monotonicity {:.4}",
            self.backtest.long_short.mean_return * 100.0,
            self.backtest.long_short.sharpe_ratio,
            self.backtest.monotonicity
        )
    }
}
