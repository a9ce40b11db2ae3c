//! Command-line arguments and their mapping onto [`EvalConfig`].

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tenor_data::PriceKind;
use tenor_eval::{AggregationConfig, EvalConfig, EvalError, ReturnKind, SortDirection};
use tenor_stats::{AggregationMethod, CorrelationMethod};
use thiserror::Error;

/// Errors raised while turning arguments into a configuration.
#[derive(Debug, Error)]
pub(crate) enum ArgsError {
    /// Config file could not be read.
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config file is not valid JSON for [`EvalConfig`].
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Argument values out of range.
    #[error(transparent)]
    Eval(#[from] EvalError),
}

#[derive(Debug, Parser)]
#[command(name = "tenor")]
#[command(about = "Tenor: cross-sectional factor evaluation", long_about = None)]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Compute IC, rank IC and a quantile backtest for a factor
    Evaluate {
        #[command(flatten)]
        common: CommonArgs,

        /// Number of quantile buckets
        #[arg(long)]
        buckets: Option<usize>,

        /// Rank bucket 0 as the highest factor values
        #[arg(long)]
        descending: bool,

        /// Treat the factor file as sub-period readings aggregated with this method
        #[arg(long)]
        aggregate: Option<AggregationMethod>,

        /// Aggregation window before each price timestamp, in seconds
        #[arg(long, default_value = "86400")]
        lookback: i64,

        /// Also write the JSON report to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// IC decay over a grid of horizons or delays
    Decay {
        #[command(flatten)]
        common: CommonArgs,

        /// Comma-separated horizons, e.g. 1,2,5,10
        #[arg(long, value_delimiter = ',', conflicts_with = "delays", required_unless_present = "delays")]
        horizons: Vec<i64>,

        /// Comma-separated delays, e.g. 0,1,2
        #[arg(long, value_delimiter = ',')]
        delays: Vec<i64>,

        /// Correlation method
        #[arg(long)]
        method: Option<CorrelationMethod>,

        /// Statistic reported per grid point (mean_ic, abs_mean_ic, icir, win_rate)
        #[arg(long, default_value = "mean_ic")]
        statistic: String,
    },
}

/// Arguments shared by every subcommand.
#[derive(Debug, Args)]
pub(crate) struct CommonArgs {
    /// Long-format factor CSV (timestamp,asset,value)
    #[arg(long)]
    pub(crate) factors: PathBuf,

    /// Long-format price CSV (timestamp,asset,value)
    #[arg(long)]
    pub(crate) prices: PathBuf,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// Price-axis steps between signal and entry
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) delay: Option<i64>,

    /// Price-axis steps between entry and exit
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) horizon: Option<i64>,

    /// Minimum assets per cross-section
    #[arg(long)]
    pub(crate) min_size: Option<usize>,

    /// Use log returns instead of simple returns
    #[arg(long)]
    pub(crate) log_returns: bool,

    /// Price file holds per-period returns rather than prices
    #[arg(long)]
    pub(crate) returns_panel: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

impl CommonArgs {
    /// Price file interpretation.
    pub(crate) const fn price_kind(&self) -> PriceKind {
        if self.returns_panel {
            PriceKind::Return
        } else {
            PriceKind::Price
        }
    }

    /// Build the configuration: file values first, then flags.
    pub(crate) fn eval_config(&self) -> Result<EvalConfig, ArgsError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => EvalConfig::default(),
        };
        if let Some(delay) = self.delay {
            config.alignment.delay = non_negative("delay", delay)?;
        }
        if let Some(horizon) = self.horizon {
            config.alignment.horizon = positive("horizon", horizon)?;
        }
        if let Some(min_size) = self.min_size {
            config.alignment.min_cross_section = min_size;
        }
        if self.log_returns {
            config.alignment.return_kind = ReturnKind::Log;
        }
        Ok(config)
    }
}

/// Apply the `evaluate`-only flags.
pub(crate) fn apply_evaluate_flags(
    config: &mut EvalConfig,
    buckets: Option<usize>,
    descending: bool,
    aggregate: Option<AggregationMethod>,
    lookback: i64,
) {
    if let Some(buckets) = buckets {
        config.backtest.buckets = buckets;
    }
    if descending {
        config.backtest.direction = SortDirection::Descending;
    }
    if let Some(method) = aggregate {
        config.aggregation = Some(AggregationConfig {
            method,
            lookback_seconds: lookback,
        });
    }
}

fn load_config(path: &Path) -> Result<EvalConfig, ArgsError> {
    let raw = fs::read_to_string(path).map_err(|source| ArgsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ArgsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Convert a signed step count, rejecting negatives.
pub(crate) fn non_negative(name: &str, value: i64) -> Result<usize, EvalError> {
    usize::try_from(value)
        .map_err(|_| EvalError::config(format!("{name} must be non-negative, got {value}")))
}

/// Convert a signed step count, rejecting zero and negatives.
pub(crate) fn positive(name: &str, value: i64) -> Result<usize, EvalError> {
    match non_negative(name, value)? {
        0 => Err(EvalError::config(format!("{name} must be positive, got 0"))),
        steps => Ok(steps),
    }
}
