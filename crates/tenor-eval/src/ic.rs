//! Information coefficient series.
//!
//! One correlation per aligned cross-section between factor values and
//! forward returns. Degenerate cross-sections produce `NaN` points; they stay
//! in the series so the time axis matches the factor panel.

use crate::align::AlignedCrossSection;
use crate::config::RunParameters;
use rayon::prelude::*;
use serde::Serialize;
use tenor_data::Timestamp;
use tenor_stats::{CorrelationMethod, Undefined};
use tracing::debug;

/// IC at one evaluation timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IcPoint {
    /// Evaluation timestamp
    pub timestamp: Timestamp,
    /// Correlation, `NaN` when undefined
    pub value: f64,
    /// Assets in the cross-section
    pub n_assets: usize,
}

impl IcPoint {
    /// Whether the IC is defined.
    pub fn is_valid(&self) -> bool {
        self.value.is_finite()
    }
}

/// IC values over time with the parameters that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IcSeries {
    method: CorrelationMethod,
    params: RunParameters,
    points: Vec<IcPoint>,
}

impl IcSeries {
    /// Assemble a series from precomputed points.
    pub const fn new(method: CorrelationMethod, params: RunParameters, points: Vec<IcPoint>) -> Self {
        Self {
            method,
            params,
            points,
        }
    }

    /// Correlation method.
    pub const fn method(&self) -> CorrelationMethod {
        self.method
    }

    /// Parameters used to align the cross-sections.
    pub const fn params(&self) -> &RunParameters {
        &self.params
    }

    /// Points in timestamp order.
    pub fn points(&self) -> &[IcPoint] {
        &self.points
    }

    /// IC values in timestamp order, `NaN` where undefined.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Evaluation timestamps.
    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    /// Number of points, defined or not.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of defined points.
    pub fn valid_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_valid()).count()
    }

    /// Running sum of the IC; undefined points carry the previous total.
    pub fn cumulative(&self) -> Vec<f64> {
        let mut total = 0.0;
        self.points
            .iter()
            .map(|p| {
                if p.is_valid() {
                    total += p.value;
                }
                total
            })
            .collect()
    }
}

/// Correlation of one cross-section, with the reason when undefined.
///
/// A cross-section below its minimum count is reported as an insufficient
/// sample even if the kernel itself could compute a value.
pub fn cross_section_ic(
    section: &AlignedCrossSection,
    method: CorrelationMethod,
) -> Result<f64, Undefined> {
    method.try_correlate(
        section.factor_values(),
        section.forward_returns(),
        section.min_count(),
    )
}

/// IC series over aligned cross-sections.
///
/// Points are computed in parallel and collected in input order, so repeated
/// calls return identical series.
pub fn ic_series(
    sections: &[AlignedCrossSection],
    method: CorrelationMethod,
    params: &RunParameters,
) -> IcSeries {
    let points: Vec<IcPoint> = sections
        .par_iter()
        .map(|section| IcPoint {
            timestamp: section.timestamp(),
            value: cross_section_ic(section, method).unwrap_or(f64::NAN),
            n_assets: section.len(),
        })
        .collect();

    let series = IcSeries::new(method, *params, points);
    debug!(
        method = %method,
        points = series.len(),
        valid = series.valid_count(),
        "computed IC series"
    );
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvalConfig;
    use approx::assert_relative_eq;
    use chrono::{NaiveDate, NaiveTime};

    fn day(d: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 2, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    fn funding_section() -> AlignedCrossSection {
        AlignedCrossSection::from_triples(
            day(1),
            vec![
                ("BTC", 0.012, 0.0010),
                ("ETH", 0.020, 0.0008),
                ("SOL", 0.030, -0.0010),
                ("AVAX", 0.055, -0.0020),
                ("DOGE", 0.080, -0.0150),
            ],
            3,
        )
    }

    #[test]
    fn test_funding_rate_cross_section() {
        let section = funding_section();
        assert_relative_eq!(
            cross_section_ic(&section, CorrelationMethod::Pearson).unwrap(),
            -0.902_992_213_543_957,
            epsilon = 1e-12
        );
        assert_eq!(cross_section_ic(&section, CorrelationMethod::Spearman), Ok(-1.0));
    }

    #[test]
    fn test_degenerate_points_are_nan() {
        let params = EvalConfig::default().run_parameters();
        let sections = vec![
            funding_section(),
            AlignedCrossSection::from_triples(day(2), vec![("BTC", 1.0, 0.1), ("ETH", 2.0, 0.2)], 3),
            AlignedCrossSection::from_triples(
                day(3),
                vec![("BTC", 1.0, 0.1), ("ETH", 1.0, 0.2), ("SOL", 1.0, 0.3)],
                3,
            ),
        ];
        let series = ic_series(&sections, CorrelationMethod::Pearson, &params);

        assert_eq!(series.len(), 3);
        assert_eq!(series.valid_count(), 1);
        assert_eq!(series.timestamps(), vec![day(1), day(2), day(3)]);
        assert!(series.points()[1].value.is_nan());
        assert_eq!(series.points()[1].n_assets, 2);
        assert!(series.points()[2].value.is_nan());
        assert_eq!(
            cross_section_ic(&sections[1], CorrelationMethod::Pearson),
            Err(Undefined::InsufficientSample {
                required: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_cumulative_skips_nan() {
        let params = EvalConfig::default().run_parameters();
        let points = [0.1, f64::NAN, -0.3, 0.05]
            .into_iter()
            .enumerate()
            .map(|(i, value)| IcPoint {
                timestamp: day(i as u32 + 1),
                value,
                n_assets: 10,
            })
            .collect();
        let series = IcSeries::new(CorrelationMethod::Spearman, params, points);
        let cumulative = series.cumulative();
        assert_relative_eq!(cumulative[1], 0.1, epsilon = 1e-12);
        assert_relative_eq!(cumulative[3], -0.15, epsilon = 1e-12);
    }

    #[test]
    fn test_series_is_idempotent() {
        let params = EvalConfig::default().run_parameters();
        let sections: Vec<AlignedCrossSection> = (1..=20)
            .map(|d| {
                AlignedCrossSection::from_triples(
                    day(d),
                    (0..30).map(|i| {
                        let x = f64::from(i * d);
                        (format!("A{i:02}"), (x * 0.37).sin(), (x * 0.11).cos())
                    }),
                    3,
                )
            })
            .collect();
        let first = ic_series(&sections, CorrelationMethod::Spearman, &params);
        let second = ic_series(&sections, CorrelationMethod::Spearman, &params);
        let bits = |s: &IcSeries| s.values().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&first), bits(&second));
        assert_eq!(first.params(), &params);
    }
}
