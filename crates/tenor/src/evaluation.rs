//! End-to-end factor evaluation.

use crate::report::{BacktestReport, EvaluationReport, IcReport};
use chrono::Utc;
use std::borrow::Cow;
use tenor_data::{FactorPanel, PricePanel, SubPeriodPanel, Timestamp};
use tenor_eval::{
    AlignedCrossSection, EvalConfig, EvalError, Result, aggregate_with_config, align, ic_series,
    monotonicity, preprocess, quantile_backtest,
};
use tenor_stats::CorrelationMethod;
use tracing::{info, warn};

/// Runs the full evaluation pipeline for one configuration.
///
/// Validates the configuration, optionally preprocesses the factor, aligns
/// it with forward returns once, then derives both IC series and the quantile
/// backtest from the same cross-sections.
#[derive(Debug, Clone, Copy, Default)]
pub struct FactorEvaluation {
    config: EvalConfig,
}

impl FactorEvaluation {
    /// Create an evaluation with the given configuration.
    pub const fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub const fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Evaluate a factor panel against prices.
    ///
    /// # Errors
    /// Fails on an invalid configuration before touching the panels.
    pub fn run(&self, factor: &FactorPanel, prices: &PricePanel) -> Result<EvaluationReport> {
        self.config.validate()?;

        let factor: Cow<'_, FactorPanel> = if self.config.preprocess.is_enabled() {
            Cow::Owned(preprocess(factor, &self.config.preprocess)?)
        } else {
            Cow::Borrowed(factor)
        };

        let sections = align(&factor, prices, &self.config.alignment)?;
        self.report(&factor, &sections)
    }

    /// Aggregate sub-period readings onto `eval_timestamps`, then evaluate.
    ///
    /// # Errors
    /// Fails if the configuration has no aggregation section or is otherwise
    /// invalid.
    pub fn run_sub_period(
        &self,
        readings: &SubPeriodPanel,
        eval_timestamps: &[Timestamp],
        prices: &PricePanel,
    ) -> Result<EvaluationReport> {
        let aggregation = self.config.aggregation.ok_or_else(|| {
            EvalError::config("sub-period evaluation requires an aggregation method")
        })?;
        self.config.validate()?;
        let factor = aggregate_with_config(readings, eval_timestamps, &aggregation)?;
        self.run(&factor, prices)
    }

    fn report(
        &self,
        factor: &FactorPanel,
        sections: &[AlignedCrossSection],
    ) -> Result<EvaluationReport> {
        let params = self.config.run_parameters();
        let usable = sections.iter().filter(|s| !s.is_degenerate()).count();
        if usable < sections.len() {
            warn!(
                degenerate = sections.len() - usable,
                total = sections.len(),
                "some cross-sections are below the minimum size"
            );
        }

        let ic = IcReport::new(ic_series(sections, CorrelationMethod::Pearson, &params));
        let rank_ic = IcReport::new(ic_series(sections, CorrelationMethod::Spearman, &params));

        let backtest = quantile_backtest(sections, &self.config.backtest, &params)?;
        let performance = &self.config.performance;
        let backtest = BacktestReport {
            mean_bucket_returns: backtest.mean_bucket_returns(),
            monotonicity: monotonicity(&backtest),
            long_short: backtest.long_short_performance(performance),
            buckets: backtest.bucket_performance(performance),
            backtest,
        };

        info!(
            %params,
            periods = sections.len(),
            usable,
            mean_ic = ic.summary.mean,
            mean_rank_ic = rank_ic.summary.mean,
            long_short = backtest.long_short.mean_return,
            "factor evaluation complete"
        );

        Ok(EvaluationReport {
            generated_at: Utc::now(),
            params,
            periods: factor.n_timestamps(),
            assets: factor.n_assets(),
            usable_cross_sections: usable,
            ic,
            rank_ic,
            backtest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{NaiveDate, TimeDelta};
    use tenor_data::PriceKind;
    use tenor_eval::{AggregationConfig, PreprocessConfig, Winsorize};
    use tenor_stats::AggregationMethod;

    fn day(d: i64) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + TimeDelta::days(d)
    }

    /// Ten assets whose daily return is proportional to their index.
    fn panels() -> (FactorPanel, PricePanel) {
        let mut factor = Vec::new();
        let mut prices = Vec::new();
        for a in 0..10 {
            let asset = format!("A{a}");
            let mut price = 50.0;
            for d in 0..20 {
                prices.push((day(d), asset.clone(), price));
                factor.push((day(d), asset.clone(), f64::from(a)));
                price *= 1.0 + 0.001 * f64::from(a) - 0.004;
            }
        }
        (
            FactorPanel::from_observations(factor).unwrap(),
            PricePanel::from_observations(prices, PriceKind::Price).unwrap(),
        )
    }

    #[test]
    fn test_run_default_config() {
        let (factor, prices) = panels();
        let report = FactorEvaluation::default().run(&factor, &prices).unwrap();

        assert_eq!(report.periods, 20);
        assert_eq!(report.assets, 10);
        assert_eq!(report.usable_cross_sections, 19);
        assert_relative_eq!(report.rank_ic.summary.mean, 1.0, epsilon = 1e-12);
        assert_relative_eq!(report.ic.summary.mean, 1.0, epsilon = 1e-9);
        assert_eq!(report.backtest.monotonicity, 1.0);
        assert!(report.backtest.long_short.mean_return > 0.0);
        assert_eq!(report.backtest.buckets.len(), 5);
    }

    #[test]
    fn test_report_renders() {
        let (factor, prices) = panels();
        let report = FactorEvaluation::default().run(&factor, &prices).unwrap();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"rank_ic\""));
        assert!(report.to_ascii_table().contains("Quantile Backtest (5 buckets"));
        assert!(report.to_ascii_table().contains("Sortino"));
        assert!(report.to_string().contains("Rank IC (spearman)"));
    }

    #[test]
    fn test_preprocessing_keeps_rank_ic() {
        let (factor, prices) = panels();
        let config = EvalConfig {
            preprocess: PreprocessConfig {
                winsorize: Some(Winsorize::Quantile {
                    lower: 0.05,
                    upper: 0.95,
                }),
                standardize: true,
            },
            ..Default::default()
        };
        let report = FactorEvaluation::new(config).run(&factor, &prices).unwrap();
        assert_relative_eq!(report.rank_ic.summary.mean, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_config_fails_first() {
        let (factor, prices) = panels();
        let mut config = EvalConfig::default();
        config.backtest.buckets = 1;
        assert!(matches!(
            FactorEvaluation::new(config).run(&factor, &prices),
            Err(EvalError::Configuration(_))
        ));
    }

    #[test]
    fn test_sub_period_requires_aggregation() {
        let (_, prices) = panels();
        let readings = SubPeriodPanel::from_readings(vec![(day(0), "A0", 1.0)]);
        let result = FactorEvaluation::default().run_sub_period(&readings, &[day(1)], &prices);
        assert!(matches!(result, Err(EvalError::Configuration(_))));
    }

    #[test]
    fn test_sub_period_run() {
        let (_, prices) = panels();
        let mut readings = Vec::new();
        for a in 0..10 {
            for d in 0..19 {
                for h in [3, 9, 15] {
                    let ts = day(d) + TimeDelta::hours(h);
                    readings.push((ts, format!("A{a}"), f64::from(a) + 0.01 * h as f64));
                }
            }
        }
        let readings = SubPeriodPanel::from_readings(readings);
        let eval: Vec<Timestamp> = (1..20).map(day).collect();
        let config = EvalConfig {
            aggregation: Some(AggregationConfig {
                method: AggregationMethod::Mean,
                lookback_seconds: 86_400,
            }),
            ..Default::default()
        };
        let report = FactorEvaluation::new(config)
            .run_sub_period(&readings, &eval, &prices)
            .unwrap();
        assert_eq!(report.params.aggregation, Some(AggregationMethod::Mean));
        assert_eq!(report.periods, 19);
        assert_relative_eq!(report.rank_ic.summary.mean, 1.0, epsilon = 1e-12);
    }
}
