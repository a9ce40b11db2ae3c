//! Subcommand implementations.

use crate::args::{CommonArgs, OutputFormat, apply_evaluate_flags, non_negative, positive};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tenor::FactorEvaluation;
use tenor_data::{FactorPanel, PricePanel, SubPeriodPanel, source::read_long_csv_path};
use tenor_eval::{DecayAxis, DecayRunner, DecayStatistic};
use tenor_stats::{AggregationMethod, CorrelationMethod};
use tracing::info;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// `tenor evaluate`
pub(crate) fn evaluate(
    common: &CommonArgs,
    buckets: Option<usize>,
    descending: bool,
    aggregate: Option<AggregationMethod>,
    lookback: i64,
    output: Option<&Path>,
) -> CliResult {
    let mut config = common.eval_config()?;
    apply_evaluate_flags(&mut config, buckets, descending, aggregate, lookback);
    config.validate()?;

    let prices = PricePanel::from_csv_path(&common.prices, common.price_kind())?;
    info!(
        path = %common.prices.display(),
        timestamps = prices.n_timestamps(),
        assets = prices.n_assets(),
        "loaded price panel"
    );

    let evaluation = FactorEvaluation::new(config);
    let report = if config.aggregation.is_some() {
        let readings = SubPeriodPanel::from_readings(read_long_csv_path(&common.factors)?);
        info!(
            path = %common.factors.display(),
            assets = readings.n_assets(),
            "loaded sub-period readings"
        );
        evaluation.run_sub_period(&readings, prices.timestamps(), &prices)?
    } else {
        let factor = FactorPanel::from_csv_path(&common.factors)?;
        info!(
            path = %common.factors.display(),
            timestamps = factor.n_timestamps(),
            assets = factor.n_assets(),
            observations = factor.observation_count(),
            "loaded factor panel"
        );
        evaluation.run(&factor, &prices)?
    };

    match common.format {
        OutputFormat::Text => println!("{}", report.to_ascii_table()),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }
    if let Some(path) = output {
        report.write_json(path)?;
        info!(path = %path.display(), "wrote report");
    }
    Ok(())
}

/// `tenor decay`
pub(crate) fn decay(
    common: &CommonArgs,
    horizons: &[i64],
    delays: &[i64],
    method: Option<CorrelationMethod>,
    statistic: &str,
) -> CliResult {
    let mut config = common.eval_config()?;
    if let Some(method) = method {
        config.correlation = method;
    }
    let statistic: DecayStatistic = statistic.parse()?;
    let horizons = horizons
        .iter()
        .map(|h| positive("horizon", *h))
        .collect::<Result<Vec<_>, _>>()?;
    let delays = delays
        .iter()
        .map(|d| non_negative("delay", *d))
        .collect::<Result<Vec<_>, _>>()?;
    config.validate()?;

    let prices = PricePanel::from_csv_path(&common.prices, common.price_kind())?;
    let (axis, grid) = if horizons.is_empty() {
        (DecayAxis::Delay, delays)
    } else {
        (DecayAxis::Horizon, horizons)
    };

    let grid_len = grid.len();
    let pb = ProgressBar::new(grid_len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Evaluating decay grid...");

    let mut runner = DecayRunner::new(config).with_progress(|point| {
        pb.set_message(format!("{} -> {:.4}", point.value, point.statistic));
        pb.inc(1);
    });
    let curve = if config.aggregation.is_some() {
        let readings = SubPeriodPanel::from_readings(read_long_csv_path(&common.factors)?);
        runner.over_sub_period(&readings, prices.timestamps(), &prices, axis, &grid, statistic)?
    } else {
        let factor = FactorPanel::from_csv_path(&common.factors)?;
        match axis {
            DecayAxis::Horizon => runner.over_horizons(&factor, &prices, &grid, statistic)?,
            DecayAxis::Delay => runner.over_delays(&factor, &prices, &grid, statistic)?,
        }
    };
    drop(runner);
    pb.finish_with_message(format!("{} grid points", curve.points.len()));

    match common.format {
        OutputFormat::Text => print!("{curve}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&curve)?),
    }
    Ok(())
}
