//! IC decay over a grid of horizons or delays.
//!
//! Each grid value reruns alignment, IC and summary with every other setting
//! held fixed. Points come back in grid order with no smoothing. Grid points
//! are evaluated sequentially; each one already parallelises across
//! timestamps.
//!
//! Sub-period readings are aggregated once with the configured method before
//! the sweep, so every grid point scores the same factor panel.

use crate::aggregate::aggregate_with_config;
use crate::align::align;
use crate::config::{AlignmentConfig, EvalConfig, RunParameters};
use crate::error::{EvalError, Result};
use crate::ic::ic_series;
use crate::preprocess::preprocess;
use crate::summary::IcSummary;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tenor_data::{FactorPanel, PricePanel, SubPeriodPanel, Timestamp};
use tenor_stats::CorrelationMethod;
use tracing::{debug, info};

/// Parameter swept by a decay run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayAxis {
    /// Holding horizon h
    Horizon,
    /// Signal-to-entry delay δ
    Delay,
}

impl fmt::Display for DecayAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Horizon => "horizon",
            Self::Delay => "delay",
        })
    }
}

/// Scalar reported for each grid point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayStatistic {
    /// Mean IC
    #[default]
    MeanIc,
    /// Absolute mean IC
    AbsMeanIc,
    /// ICIR
    Icir,
    /// Win rate
    WinRate,
}

impl DecayStatistic {
    /// Extract the statistic from a summary.
    pub fn extract(self, summary: &IcSummary) -> f64 {
        match self {
            Self::MeanIc => summary.mean,
            Self::AbsMeanIc => summary.mean.abs(),
            Self::Icir => summary.icir,
            Self::WinRate => summary.win_rate,
        }
    }
}

impl std::str::FromStr for DecayStatistic {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" | "mean_ic" => Ok(Self::MeanIc),
            "abs" | "abs_mean_ic" => Ok(Self::AbsMeanIc),
            "icir" => Ok(Self::Icir),
            "win_rate" => Ok(Self::WinRate),
            other => Err(EvalError::config(format!("unknown decay statistic: {other}"))),
        }
    }
}

/// One grid point of a decay curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecayPoint {
    /// Grid value (horizon or delay, in price steps)
    pub value: usize,
    /// Selected statistic
    pub statistic: f64,
    /// Full IC summary at this grid value
    pub summary: IcSummary,
    /// Parameters of this point, grid value substituted
    pub params: RunParameters,
}

/// Statistic as a function of horizon or delay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecayCurve {
    /// Swept parameter
    pub axis: DecayAxis,
    /// Correlation method used
    pub method: CorrelationMethod,
    /// Reported statistic
    pub statistic: DecayStatistic,
    /// Base parameters; the swept one varies per point
    pub params: RunParameters,
    /// Points in grid order
    pub points: Vec<DecayPoint>,
    /// False when the run was cancelled before the last grid point
    pub completed: bool,
}

impl DecayCurve {
    /// Grid values in order.
    pub fn grid(&self) -> Vec<usize> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Statistic values in grid order.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.statistic).collect()
    }
}

impl fmt::Display for DecayCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IC decay by {} ({}, {:?})", self.axis, self.method, self.statistic)?;
        writeln!(f, "  base: {}", self.params)?;
        writeln!(f, "  {:>8}  {:>10}  {:>8}", self.axis, "statistic", "valid")?;
        for point in &self.points {
            writeln!(
                f,
                "  {:>8}  {:>10.4}  {:>8}",
                point.value, point.statistic, point.summary.valid
            )?;
        }
        if !self.completed {
            writeln!(f, "  (cancelled)")?;
        }
        Ok(())
    }
}

type Progress<'a> = Box<dyn FnMut(&DecayPoint) + 'a>;

/// Runs decay sweeps with optional cancellation and progress reporting.
///
/// The cancel flag is checked before each grid point; a point already being
/// evaluated runs to completion.
pub struct DecayRunner<'a> {
    config: EvalConfig,
    cancel: Arc<AtomicBool>,
    progress: Option<Progress<'a>>,
}

impl fmt::Debug for DecayRunner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecayRunner")
            .field("config", &self.config)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<'a> DecayRunner<'a> {
    /// Create a runner for a base configuration.
    pub fn new(config: EvalConfig) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    /// Share an external cancel flag.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Call `progress` after every completed grid point.
    pub fn with_progress(mut self, progress: impl FnMut(&DecayPoint) + 'a) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Handle that cancels this runner when set.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Sweep the holding horizon.
    ///
    /// # Errors
    /// Fails on an empty grid, a zero horizon, an aggregation section in the
    /// configuration or an otherwise invalid base configuration.
    pub fn over_horizons(
        &mut self,
        factor: &FactorPanel,
        prices: &PricePanel,
        horizons: &[usize],
        statistic: DecayStatistic,
    ) -> Result<DecayCurve> {
        self.over_factor(factor, prices, DecayAxis::Horizon, horizons, statistic)
    }

    /// Sweep the signal-to-entry delay.
    ///
    /// # Errors
    /// Fails on an empty grid, an aggregation section in the configuration or
    /// an otherwise invalid base configuration.
    pub fn over_delays(
        &mut self,
        factor: &FactorPanel,
        prices: &PricePanel,
        delays: &[usize],
        statistic: DecayStatistic,
    ) -> Result<DecayCurve> {
        self.over_factor(factor, prices, DecayAxis::Delay, delays, statistic)
    }

    /// Aggregate sub-period readings onto `eval_timestamps` once, then sweep
    /// `axis` over `grid`.
    ///
    /// # Errors
    /// Fails if the configuration has no aggregation section, on an empty
    /// grid, a zero horizon or an otherwise invalid base configuration.
    pub fn over_sub_period(
        &mut self,
        readings: &SubPeriodPanel,
        eval_timestamps: &[Timestamp],
        prices: &PricePanel,
        axis: DecayAxis,
        grid: &[usize],
        statistic: DecayStatistic,
    ) -> Result<DecayCurve> {
        let aggregation = self.config.aggregation.ok_or_else(|| {
            EvalError::config("sub-period decay requires an aggregation method")
        })?;
        check_grid(axis, grid)?;
        self.config.validate()?;
        let factor = aggregate_with_config(readings, eval_timestamps, &aggregation)?;
        self.sweep(&factor, prices, axis, grid, statistic)
    }

    fn over_factor(
        &mut self,
        factor: &FactorPanel,
        prices: &PricePanel,
        axis: DecayAxis,
        grid: &[usize],
        statistic: DecayStatistic,
    ) -> Result<DecayCurve> {
        if let Some(aggregation) = self.config.aggregation {
            return Err(EvalError::config(format!(
                "conflicting aggregation settings: {} aggregation is configured but \
                 the factor panel is already aggregated; sweep the sub-period readings instead",
                aggregation.method
            )));
        }
        check_grid(axis, grid)?;
        self.sweep(factor, prices, axis, grid, statistic)
    }

    fn sweep(
        &mut self,
        factor: &FactorPanel,
        prices: &PricePanel,
        axis: DecayAxis,
        grid: &[usize],
        statistic: DecayStatistic,
    ) -> Result<DecayCurve> {
        self.config.validate()?;

        let factor: Cow<'_, FactorPanel> = if self.config.preprocess.is_enabled() {
            Cow::Owned(preprocess(factor, &self.config.preprocess)?)
        } else {
            Cow::Borrowed(factor)
        };
        let method = self.config.correlation;

        let mut curve = DecayCurve {
            axis,
            method,
            statistic,
            params: self.config.run_parameters(),
            points: Vec::with_capacity(grid.len()),
            completed: true,
        };

        for &value in grid {
            if self.is_cancelled() {
                curve.completed = false;
                info!(%axis, evaluated = curve.points.len(), "decay run cancelled");
                break;
            }

            let mut config = self.config;
            config.alignment = with_grid_value(config.alignment, axis, value);
            let point = evaluate_point(&factor, prices, &config, value, statistic)?;
            debug!(%axis, value, statistic = point.statistic, "decay point");
            if let Some(progress) = self.progress.as_mut() {
                progress(&point);
            }
            curve.points.push(point);
        }

        Ok(curve)
    }
}

fn check_grid(axis: DecayAxis, grid: &[usize]) -> Result<()> {
    if grid.is_empty() {
        return Err(EvalError::config(format!("decay {axis} grid is empty")));
    }
    if axis == DecayAxis::Horizon && grid.contains(&0) {
        return Err(EvalError::config("decay horizons must be positive"));
    }
    Ok(())
}

fn evaluate_point(
    factor: &FactorPanel,
    prices: &PricePanel,
    config: &EvalConfig,
    value: usize,
    statistic: DecayStatistic,
) -> Result<DecayPoint> {
    let params = config.run_parameters();
    let sections = align(factor, prices, &config.alignment)?;
    let series = ic_series(&sections, config.correlation, &params);
    let summary = IcSummary::from_series(&series);
    Ok(DecayPoint {
        value,
        statistic: statistic.extract(&summary),
        summary,
        params,
    })
}

/// Decay of the IC statistic over holding horizons.
///
/// # Errors
/// Fails on an empty grid, a zero horizon or an invalid configuration.
pub fn decay_over_horizons(
    factor: &FactorPanel,
    prices: &PricePanel,
    config: &EvalConfig,
    horizons: &[usize],
    statistic: DecayStatistic,
) -> Result<DecayCurve> {
    DecayRunner::new(*config).over_horizons(factor, prices, horizons, statistic)
}

/// Decay of the IC statistic over signal-to-entry delays.
///
/// # Errors
/// Fails on an empty grid or an invalid configuration.
pub fn decay_over_delays(
    factor: &FactorPanel,
    prices: &PricePanel,
    config: &EvalConfig,
    delays: &[usize],
    statistic: DecayStatistic,
) -> Result<DecayCurve> {
    DecayRunner::new(*config).over_delays(factor, prices, delays, statistic)
}

/// Base alignment settings with one grid value substituted.
pub fn with_grid_value(base: AlignmentConfig, axis: DecayAxis, value: usize) -> AlignmentConfig {
    let mut config = base;
    match axis {
        DecayAxis::Horizon => config.horizon = value,
        DecayAxis::Delay => config.delay = value,
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AggregationConfig;
    use chrono::{NaiveDate, TimeDelta};
    use tenor_data::PriceKind;
    use tenor_stats::AggregationMethod;

    fn day(d: i64) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + TimeDelta::days(d)
    }

    /// Factor equals the next-day return, so horizon 1 is perfectly predictive.
    fn panels() -> (FactorPanel, PricePanel) {
        let assets = ["A", "B", "C", "D", "E", "F"];
        let mut prices = Vec::new();
        let mut factor = Vec::new();
        for (i, asset) in assets.iter().enumerate() {
            let mut price = 100.0;
            for d in 0..30 {
                prices.push((day(d), *asset, price));
                let r = ((i as f64 + 1.0) * (d as f64 + 1.0) * 0.7).sin() * 0.02;
                factor.push((day(d), *asset, r));
                price *= 1.0 + r;
            }
        }
        (
            FactorPanel::from_observations(factor).unwrap(),
            PricePanel::from_observations(prices, PriceKind::Price).unwrap(),
        )
    }

    #[test]
    fn test_horizon_one_is_perfect() {
        let (factor, prices) = panels();
        let config = EvalConfig {
            correlation: CorrelationMethod::Spearman,
            ..Default::default()
        };
        let curve =
            decay_over_horizons(&factor, &prices, &config, &[1, 2, 5], DecayStatistic::MeanIc)
                .unwrap();
        assert!(curve.completed);
        assert_eq!(curve.grid(), vec![1, 2, 5]);
        assert_eq!(curve.points[0].statistic, 1.0);
        assert!(curve.points[1].statistic < 1.0);
        assert_eq!(curve.points[2].summary.valid, 25);

        assert_eq!(curve.params, config.run_parameters());
        assert_eq!(curve.params.horizon, 1);
        for point in &curve.points {
            assert_eq!(point.params.horizon, point.value);
            assert_eq!(point.params.delay, config.alignment.delay);
            assert_eq!(point.params.return_kind, config.alignment.return_kind);
            assert_eq!(point.params.min_cross_section, config.alignment.min_cross_section);
            assert_eq!(point.params.aggregation, None);
        }
    }

    /// One reading twelve hours before each price timestamp, equal to the
    /// factor of `panels`.
    fn readings(factor: &FactorPanel) -> SubPeriodPanel {
        let mut readings = Vec::new();
        for (row, &t) in factor.timestamps().iter().enumerate() {
            for (col, asset) in factor.assets().iter().enumerate() {
                if let Some(value) = factor.get(row, col) {
                    readings.push((t - TimeDelta::hours(12), asset.clone(), value));
                }
            }
        }
        SubPeriodPanel::from_readings(readings)
    }

    fn aggregated_config() -> EvalConfig {
        EvalConfig {
            correlation: CorrelationMethod::Spearman,
            aggregation: Some(AggregationConfig {
                method: AggregationMethod::Mean,
                lookback_seconds: 86_400,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_sub_period_sweep_aggregates_once() {
        let (factor, prices) = panels();
        let plain = decay_over_horizons(
            &factor,
            &prices,
            &EvalConfig {
                correlation: CorrelationMethod::Spearman,
                ..Default::default()
            },
            &[1, 3],
            DecayStatistic::MeanIc,
        )
        .unwrap();

        let curve = DecayRunner::new(aggregated_config())
            .over_sub_period(
                &readings(&factor),
                prices.timestamps(),
                &prices,
                DecayAxis::Horizon,
                &[1, 3],
                DecayStatistic::MeanIc,
            )
            .unwrap();
        assert_eq!(curve.values(), plain.values());
        assert_eq!(curve.params.aggregation, Some(AggregationMethod::Mean));
        assert!(curve.points.iter().all(|p| p.params.aggregation == Some(AggregationMethod::Mean)));
    }

    #[test]
    fn test_aggregation_settings_must_match_input() {
        let (factor, prices) = panels();
        assert!(matches!(
            decay_over_horizons(
                &factor,
                &prices,
                &aggregated_config(),
                &[1],
                DecayStatistic::MeanIc
            ),
            Err(EvalError::Configuration(_))
        ));
        assert!(matches!(
            DecayRunner::new(EvalConfig::default()).over_sub_period(
                &readings(&factor),
                prices.timestamps(),
                &prices,
                DecayAxis::Delay,
                &[0],
                DecayStatistic::MeanIc,
            ),
            Err(EvalError::Configuration(_))
        ));
    }

    #[test]
    fn test_delay_grid_order() {
        let (factor, prices) = panels();
        let curve = decay_over_delays(
            &factor,
            &prices,
            &EvalConfig::default(),
            &[2, 0, 1],
            DecayStatistic::AbsMeanIc,
        )
        .unwrap();
        assert_eq!(curve.grid(), vec![2, 0, 1]);
        assert!(curve.values().iter().all(|v| *v >= 0.0));
        assert!(curve.points[1].statistic > curve.points[0].statistic);
    }

    #[test]
    fn test_empty_grid_and_zero_horizon_rejected() {
        let (factor, prices) = panels();
        let config = EvalConfig::default();
        assert!(matches!(
            decay_over_horizons(&factor, &prices, &config, &[], DecayStatistic::MeanIc),
            Err(EvalError::Configuration(_))
        ));
        assert!(matches!(
            decay_over_horizons(&factor, &prices, &config, &[1, 0], DecayStatistic::MeanIc),
            Err(EvalError::Configuration(_))
        ));
    }

    #[test]
    fn test_cancel_stops_between_points() {
        let (factor, prices) = panels();
        let mut seen = 0;
        let runner = DecayRunner::new(EvalConfig::default());
        let cancel = runner.cancel_flag();
        let mut runner = runner.with_progress(|_| {
            seen += 1;
            if seen == 2 {
                cancel.store(true, Ordering::Relaxed);
            }
        });
        let curve = runner
            .over_horizons(&factor, &prices, &[1, 2, 3, 4], DecayStatistic::Icir)
            .unwrap();
        drop(runner);
        assert!(!curve.completed);
        assert_eq!(curve.points.len(), 2);
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_grid_value_substitution() {
        let base = AlignmentConfig::default();
        assert_eq!(with_grid_value(base, DecayAxis::Delay, 3).delay, 3);
        assert_eq!(with_grid_value(base, DecayAxis::Horizon, 4).horizon, 4);
    }

    #[test]
    fn test_statistic_parse() {
        assert_eq!("icir".parse::<DecayStatistic>().unwrap(), DecayStatistic::Icir);
        assert!("median".parse::<DecayStatistic>().is_err());
    }
}
