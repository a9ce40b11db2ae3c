//! Sub-period readings to factor panel.

use crate::config::AggregationConfig;
use crate::error::{EvalError, Result};
use chrono::{NaiveDateTime, TimeDelta};
use ndarray::Array2;
use rayon::prelude::*;
use tenor_data::{FactorPanel, SubPeriodPanel, Timestamp};
use tenor_stats::AggregationMethod;
use tracing::debug;

/// Collapse sub-period readings into one factor value per evaluation
/// timestamp and asset, using the window `[t - lookback, t)`.
///
/// Windows with fewer usable readings than the method needs become missing
/// cells. Assets are laid out in lexical order.
///
/// # Errors
/// Fails if `lookback` is not positive or the evaluation timestamps are not
/// strictly ascending.
pub fn aggregate_panel(
    sub: &SubPeriodPanel,
    eval_timestamps: &[Timestamp],
    lookback: TimeDelta,
    method: AggregationMethod,
) -> Result<FactorPanel> {
    if lookback <= TimeDelta::zero() {
        return Err(EvalError::config(format!(
            "aggregation lookback must be positive, got {lookback}"
        )));
    }

    let assets: Vec<String> = sub.assets().map(str::to_string).collect();
    let columns: Vec<Vec<f64>> = assets
        .par_iter()
        .map(|asset| {
            eval_timestamps
                .iter()
                .map(|&t| {
                    // a lookback reaching before the calendar covers all history
                    let start = t.checked_sub_signed(lookback).unwrap_or(NaiveDateTime::MIN);
                    let window: Vec<f64> = sub
                        .window(asset, start, t)
                        .iter()
                        .map(|(_, v)| *v)
                        .collect();
                    method.apply(&window)
                })
                .collect()
        })
        .collect();

    let mut values = Array2::from_elem((eval_timestamps.len(), assets.len()), f64::NAN);
    for (col, column) in columns.iter().enumerate() {
        for (row, value) in column.iter().enumerate() {
            values[[row, col]] = *value;
        }
    }

    let panel = FactorPanel::new(eval_timestamps.to_vec(), assets, values)?;
    debug!(
        method = %method,
        lookback_seconds = lookback.num_seconds(),
        timestamps = panel.n_timestamps(),
        assets = panel.n_assets(),
        defined = panel.observation_count(),
        "aggregated sub-period readings"
    );
    Ok(panel)
}

/// [`aggregate_panel`] driven by an [`AggregationConfig`].
pub fn aggregate_with_config(
    sub: &SubPeriodPanel,
    eval_timestamps: &[Timestamp],
    config: &AggregationConfig,
) -> Result<FactorPanel> {
    config.validate()?;
    let lookback = TimeDelta::try_seconds(config.lookback_seconds).ok_or_else(|| {
        EvalError::config(format!(
            "aggregation lookback out of range: {}s",
            config.lookback_seconds
        ))
    })?;
    aggregate_panel(sub, eval_timestamps, lookback, config.method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn readings() -> SubPeriodPanel {
        SubPeriodPanel::from_readings(vec![
            (at(1, 1), "ETH", 0.2),
            (at(1, 6), "ETH", 0.4),
            (at(1, 23), "ETH", 0.9),
            (at(2, 0), "ETH", 5.0),
            (at(1, 2), "BTC", -0.1),
            (at(1, 3), "BTC", f64::NAN),
            (at(2, 4), "BTC", 0.3),
        ])
    }

    #[test]
    fn test_daily_mean_excludes_window_end() {
        let panel = aggregate_panel(
            &readings(),
            &[at(2, 0), at(3, 0)],
            TimeDelta::days(1),
            AggregationMethod::Mean,
        )
        .unwrap();

        assert_eq!(panel.assets(), &["BTC".to_string(), "ETH".to_string()]);
        assert_relative_eq!(panel.value(at(2, 0), "ETH").unwrap(), 0.5, epsilon = 1e-12);
        assert_eq!(panel.value(at(3, 0), "ETH"), Some(5.0));
        // NaN reading dropped before averaging
        assert_eq!(panel.value(at(2, 0), "BTC"), Some(-0.1));
        assert_eq!(panel.value(at(3, 0), "BTC"), Some(0.3));
    }

    #[test]
    fn test_lookback_beyond_calendar_covers_all_history() {
        let config = AggregationConfig {
            method: AggregationMethod::Mean,
            lookback_seconds: 10_000_000_000_000,
        };
        let panel = aggregate_with_config(&readings(), &[at(2, 0), at(3, 0)], &config).unwrap();
        assert_relative_eq!(panel.value(at(2, 0), "ETH").unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(panel.value(at(3, 0), "ETH").unwrap(), 6.5 / 4.0, epsilon = 1e-12);
        assert_relative_eq!(panel.value(at(3, 0), "BTC").unwrap(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_short_window_is_missing() {
        let panel = aggregate_panel(
            &readings(),
            &[at(2, 0)],
            TimeDelta::days(1),
            AggregationMethod::Std,
        )
        .unwrap();
        assert!(panel.value(at(2, 0), "ETH").is_some());
        assert_eq!(panel.value(at(2, 0), "BTC"), None);
    }

    #[test]
    fn test_non_positive_lookback_rejected() {
        let result = aggregate_panel(
            &readings(),
            &[at(2, 0)],
            TimeDelta::zero(),
            AggregationMethod::Mean,
        );
        assert!(matches!(result, Err(EvalError::Configuration(_))));
    }

    #[test]
    fn test_unsorted_evaluation_timestamps_rejected() {
        let result = aggregate_panel(
            &readings(),
            &[at(3, 0), at(2, 0)],
            TimeDelta::days(1),
            AggregationMethod::Mean,
        );
        assert!(matches!(result, Err(EvalError::Data(_))));
    }

    #[test]
    fn test_config_driven() {
        let config = AggregationConfig {
            method: AggregationMethod::Max,
            lookback_seconds: 3 * 3600,
        };
        let panel = aggregate_with_config(&readings(), &[at(1, 7)], &config).unwrap();
        assert_eq!(panel.value(at(1, 7), "ETH"), Some(0.4));
        assert_eq!(panel.value(at(1, 7), "BTC"), None);
    }
}
