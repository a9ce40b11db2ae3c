//! Sub-period aggregation.
//!
//! Collapses a sequence of raw readings (for example per-minute sentiment
//! scores) into one scalar per evaluation period. Non-finite readings are
//! dropped before the minimum count of the method is checked; a window that
//! falls short yields `NaN`.

use crate::moments::{central_moments, is_constant, mean, quantile_sorted, sample_std};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Statistic used to collapse a window of readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    /// Arithmetic mean
    Mean = 0,
    /// Median (average of the two middle values for even counts)
    Median = 1,
    /// Maximum
    Max = 2,
    /// Minimum
    Min = 3,
    /// Maximum minus minimum
    Range = 4,
    /// Sample standard deviation (n-1)
    Std = 5,
    /// Mean of absolute values
    AbsMean = 6,
    /// Fraction of readings strictly above zero
    PositiveRatio = 7,
    /// Fisher-Pearson skewness (biased)
    Skew = 8,
    /// Excess kurtosis (biased)
    Kurtosis = 9,
}

type Reducer = fn(&[f64]) -> f64;

// Indexed by the enum discriminant.
const REDUCERS: [Reducer; 10] = [
    mean,
    median,
    max,
    min,
    range,
    sample_std,
    abs_mean,
    positive_ratio,
    skew,
    kurtosis,
];

impl AggregationMethod {
    /// Every supported method.
    pub const ALL: [Self; 10] = [
        Self::Mean,
        Self::Median,
        Self::Max,
        Self::Min,
        Self::Range,
        Self::Std,
        Self::AbsMean,
        Self::PositiveRatio,
        Self::Skew,
        Self::Kurtosis,
    ];

    /// Canonical lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Max => "max",
            Self::Min => "min",
            Self::Range => "range",
            Self::Std => "std",
            Self::AbsMean => "abs_mean",
            Self::PositiveRatio => "positive_ratio",
            Self::Skew => "skew",
            Self::Kurtosis => "kurtosis",
        }
    }

    /// Minimum number of finite readings for a defined result.
    pub const fn min_count(self) -> usize {
        match self {
            Self::Std => 2,
            Self::Skew => 3,
            Self::Kurtosis => 4,
            _ => 1,
        }
    }

    /// Apply the method to a window of readings.
    pub fn apply(self, values: &[f64]) -> f64 {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.len() < self.min_count() {
            return f64::NAN;
        }
        REDUCERS[self as usize](&finite)
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown aggregation method name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown aggregation method: {0}")]
pub struct UnknownAggregation(pub String);

impl FromStr for AggregationMethod {
    type Err = UnknownAggregation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| UnknownAggregation(s.to_string()))
    }
}

/// Aggregate a window of readings with the given method.
pub fn aggregate(values: &[f64], method: AggregationMethod) -> f64 {
    method.apply(values)
}

/// Aggregate the readings whose timestamp lies in `[start, end)`.
pub fn aggregate_window<T: Ord + Copy>(
    readings: &[(T, f64)],
    start: T,
    end: T,
    method: AggregationMethod,
) -> f64 {
    let window: Vec<f64> = readings
        .iter()
        .filter(|(ts, _)| *ts >= start && *ts < end)
        .map(|(_, v)| *v)
        .collect();
    method.apply(&window)
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, 0.5)
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn range(values: &[f64]) -> f64 {
    if is_constant(values) {
        return 0.0;
    }
    max(values) - min(values)
}

fn abs_mean(values: &[f64]) -> f64 {
    values.iter().map(|v| v.abs()).sum::<f64>() / values.len() as f64
}

fn positive_ratio(values: &[f64]) -> f64 {
    values.iter().filter(|v| **v > 0.0).count() as f64 / values.len() as f64
}

fn skew(values: &[f64]) -> f64 {
    central_moments(values).map_or(f64::NAN, |(m2, m3, _)| m3 / m2.powf(1.5))
}

fn kurtosis(values: &[f64]) -> f64 {
    central_moments(values).map_or(f64::NAN, |(m2, _, m4)| m4 / (m2 * m2) - 3.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(AggregationMethod::Mean, 2.5)]
    #[case(AggregationMethod::Median, 2.5)]
    #[case(AggregationMethod::Max, 4.0)]
    #[case(AggregationMethod::Min, 1.0)]
    #[case(AggregationMethod::Range, 3.0)]
    #[case(AggregationMethod::AbsMean, 2.5)]
    #[case(AggregationMethod::PositiveRatio, 1.0)]
    #[case(AggregationMethod::Skew, 0.0)]
    fn test_basic_methods(#[case] method: AggregationMethod, #[case] expected: f64) {
        assert_relative_eq!(aggregate(&[1.0, 2.0, 3.0, 4.0], method), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_std_is_sample_std() {
        let std = aggregate(&[1.0, 2.0, 3.0, 4.0], AggregationMethod::Std);
        assert_relative_eq!(std, (5.0f64 / 3.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_identical_values() {
        let window = [0.37; 6];
        assert_eq!(aggregate(&window, AggregationMethod::Mean), 0.37);
        assert_eq!(aggregate(&window, AggregationMethod::Std), 0.0);
        assert_eq!(aggregate(&window, AggregationMethod::Range), 0.0);
        assert!(aggregate(&window, AggregationMethod::Skew).is_nan());
        assert!(aggregate(&window, AggregationMethod::Kurtosis).is_nan());
    }

    #[rstest]
    #[case(AggregationMethod::Mean, 0)]
    #[case(AggregationMethod::Std, 1)]
    #[case(AggregationMethod::Skew, 2)]
    #[case(AggregationMethod::Kurtosis, 3)]
    fn test_below_minimum_count_is_nan(#[case] method: AggregationMethod, #[case] n: usize) {
        let values: Vec<f64> = (0..n).map(|i| i as f64).collect();
        assert!(aggregate(&values, method).is_nan());
    }

    #[test]
    fn test_single_value_range_is_zero() {
        assert_eq!(aggregate(&[5.0], AggregationMethod::Range), 0.0);
    }

    #[test]
    fn test_missing_readings_are_ignored() {
        let values = [1.0, f64::NAN, 3.0, f64::INFINITY];
        assert_relative_eq!(aggregate(&values, AggregationMethod::Mean), 2.0);
        assert!(aggregate(&[f64::NAN, 1.0], AggregationMethod::Std).is_nan());
    }

    #[test]
    fn test_skew_and_kurtosis_values() {
        let values = [1.0, 2.0, 3.0, 10.0];
        // mean 4, deviations -3 -2 -1 6: m2 = 12.5, m3 = 45, m4 = 348.5
        assert_relative_eq!(
            aggregate(&values, AggregationMethod::Skew),
            45.0 / 12.5f64.powf(1.5),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            aggregate(&values, AggregationMethod::Kurtosis),
            348.5 / (12.5 * 12.5) - 3.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_positive_ratio_and_abs_mean() {
        let values = [-2.0, 0.0, 1.0, 3.0];
        assert_relative_eq!(aggregate(&values, AggregationMethod::PositiveRatio), 0.5);
        assert_relative_eq!(aggregate(&values, AggregationMethod::AbsMean), 1.5);
    }

    #[test]
    fn test_window_is_half_open() {
        let readings = [(1, 10.0), (2, 20.0), (3, 30.0), (4, 40.0)];
        assert_relative_eq!(
            aggregate_window(&readings, 2, 4, AggregationMethod::Mean),
            25.0
        );
        assert!(aggregate_window(&readings, 5, 9, AggregationMethod::Mean).is_nan());
    }

    #[test]
    fn test_parse_round_trip() {
        for method in AggregationMethod::ALL {
            assert_eq!(method.name().parse::<AggregationMethod>().unwrap(), method);
        }
        assert!("variance".parse::<AggregationMethod>().is_err());
    }
}
