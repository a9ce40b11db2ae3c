//! Quantile (stratified) backtest.
//!
//! Each cross-section is ranked by factor value and split into Q buckets of
//! near-equal size. Bucket identity is purely rank-based: bucket 0 holds the
//! lowest values when ascending and the highest when descending. The
//! long-short spread is bucket Q-1 minus bucket 0.

use crate::align::AlignedCrossSection;
use crate::config::{BacktestConfig, PerformanceConfig, RunParameters, SortDirection};
use crate::error::{EvalError, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use tenor_data::Timestamp;
use tenor_stats::moments::mean;
use tenor_stats::{PerformanceStats, cumulative_returns};
use tracing::debug;

/// Bucket membership for one cross-section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuantileAssignment {
    /// Cross-section positions in rank order
    order: Vec<usize>,
    /// Bucket of each cross-section position
    bucket_of: Vec<usize>,
    /// Bucket sizes, larger buckets first
    sizes: Vec<usize>,
}

impl QuantileAssignment {
    /// Number of buckets.
    pub fn buckets(&self) -> usize {
        self.sizes.len()
    }

    /// Bucket sizes in bucket order.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Cross-section positions sorted by rank.
    pub fn ranked(&self) -> &[usize] {
        &self.order
    }

    /// Bucket of the asset at a cross-section position.
    pub fn bucket_of(&self, position: usize) -> Option<usize> {
        self.bucket_of.get(position).copied()
    }

    /// Cross-section positions in a bucket, in rank order.
    pub fn members(&self, bucket: usize) -> &[usize] {
        if bucket >= self.sizes.len() {
            return &[];
        }
        let start: usize = self.sizes[..bucket].iter().sum();
        &self.order[start..start + self.sizes[bucket]]
    }
}

/// Split a cross-section into `buckets` rank-ordered groups.
///
/// Ties in factor value are broken by asset identifier, ascending. With N
/// assets each bucket receives `N / Q` members and the first `N % Q` buckets
/// one extra.
///
/// # Errors
/// Fails unless `2 <= buckets <= N`.
pub fn stratify(
    section: &AlignedCrossSection,
    buckets: usize,
    direction: SortDirection,
) -> Result<QuantileAssignment> {
    let n = section.len();
    if buckets < 2 || buckets > n {
        return Err(EvalError::config(format!(
            "bucket count must satisfy 2 <= Q <= N, got Q={buckets} N={n}"
        )));
    }

    let factors = section.factor_values();
    let assets = section.assets();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        let by_value = match direction {
            SortDirection::Ascending => factors[a].total_cmp(&factors[b]),
            SortDirection::Descending => factors[b].total_cmp(&factors[a]),
        };
        match by_value {
            Ordering::Equal => assets[a].cmp(&assets[b]),
            other => other,
        }
    });

    let base = n / buckets;
    let extra = n % buckets;
    let sizes: Vec<usize> = (0..buckets).map(|b| base + usize::from(b < extra)).collect();

    let mut bucket_of = vec![0; n];
    let mut rank = 0;
    for (bucket, size) in sizes.iter().enumerate() {
        for &position in &order[rank..rank + size] {
            bucket_of[position] = bucket;
        }
        rank += size;
    }

    Ok(QuantileAssignment {
        order,
        bucket_of,
        sizes,
    })
}

/// Equal-weighted mean forward return of each bucket.
pub fn bucket_returns(assignment: &QuantileAssignment, section: &AlignedCrossSection) -> Vec<f64> {
    let returns = section.forward_returns();
    (0..assignment.buckets())
        .map(|bucket| {
            let members: Vec<f64> = assignment
                .members(bucket)
                .iter()
                .map(|&position| returns[position])
                .collect();
            mean(&members)
        })
        .collect()
}

/// Bucket returns and spread at one evaluation timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnPoint {
    /// Evaluation timestamp
    pub timestamp: Timestamp,
    /// Mean forward return per bucket, `NaN` when the cross-section was unusable
    pub bucket_returns: Vec<f64>,
    /// Top bucket minus bottom bucket
    pub long_short: f64,
    /// Assets in the cross-section
    pub n_assets: usize,
}

/// Result of a quantile backtest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantileBacktest {
    params: RunParameters,
    buckets: usize,
    direction: SortDirection,
    points: Vec<ReturnPoint>,
}

impl QuantileBacktest {
    /// Parameters used to align the cross-sections.
    pub const fn params(&self) -> &RunParameters {
        &self.params
    }

    /// Number of buckets.
    pub const fn buckets(&self) -> usize {
        self.buckets
    }

    /// Ranking direction.
    pub const fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Per-timestamp returns in timestamp order.
    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    /// Number of timestamps where every bucket was defined.
    pub fn valid_periods(&self) -> usize {
        self.points.iter().filter(|p| p.long_short.is_finite()).count()
    }

    /// Return series of one bucket over time.
    pub fn bucket_series(&self, bucket: usize) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.bucket_returns.get(bucket).copied().unwrap_or(f64::NAN))
            .collect()
    }

    /// Long-short spread series over time.
    pub fn long_short_series(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.long_short).collect()
    }

    /// Time-averaged return of each bucket, skipping undefined periods.
    pub fn mean_bucket_returns(&self) -> Vec<f64> {
        (0..self.buckets)
            .map(|bucket| nan_mean(&self.bucket_series(bucket)))
            .collect()
    }

    /// Time-averaged long-short spread, skipping undefined periods.
    pub fn mean_long_short(&self) -> f64 {
        nan_mean(&self.long_short_series())
    }

    /// Compounded equity curve of each bucket.
    pub fn cumulative_bucket_returns(&self) -> Vec<Vec<f64>> {
        (0..self.buckets)
            .map(|bucket| cumulative_returns(&self.bucket_series(bucket)))
            .collect()
    }

    /// Compounded equity curve of the long-short spread.
    pub fn cumulative_long_short(&self) -> Vec<f64> {
        cumulative_returns(&self.long_short_series())
    }

    /// Return statistics of the long-short spread.
    pub fn long_short_performance(&self, config: &PerformanceConfig) -> PerformanceStats {
        PerformanceStats::from_returns(
            &self.long_short_series(),
            config.periods_per_year,
            config.risk_free_rate,
        )
    }

    /// Return statistics of each bucket.
    pub fn bucket_performance(&self, config: &PerformanceConfig) -> Vec<PerformanceStats> {
        (0..self.buckets)
            .map(|bucket| {
                PerformanceStats::from_returns(
                    &self.bucket_series(bucket),
                    config.periods_per_year,
                    config.risk_free_rate,
                )
            })
            .collect()
    }
}

fn nan_mean(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    mean(&finite)
}

/// Run a quantile backtest over aligned cross-sections.
///
/// The bucket count is validated once up front. A cross-section that is
/// degenerate or smaller than the bucket count contributes `NaN` to every
/// bucket and to the spread.
///
/// # Errors
/// Fails if the configuration is invalid.
pub fn quantile_backtest(
    sections: &[AlignedCrossSection],
    config: &BacktestConfig,
    params: &RunParameters,
) -> Result<QuantileBacktest> {
    config.validate()?;
    let q = config.buckets;

    let points: Vec<ReturnPoint> = sections
        .par_iter()
        .map(|section| {
            let returns = if section.is_degenerate() || section.len() < q {
                None
            } else {
                stratify(section, q, config.direction)
                    .ok()
                    .map(|assignment| bucket_returns(&assignment, section))
            };
            let bucket_returns = returns.unwrap_or_else(|| vec![f64::NAN; q]);
            ReturnPoint {
                timestamp: section.timestamp(),
                long_short: bucket_returns[q - 1] - bucket_returns[0],
                bucket_returns,
                n_assets: section.len(),
            }
        })
        .collect();

    let backtest = QuantileBacktest {
        params: *params,
        buckets: q,
        direction: config.direction,
        points,
    };
    debug!(
        buckets = q,
        periods = backtest.points.len(),
        valid = backtest.valid_periods(),
        "ran quantile backtest"
    );
    Ok(backtest)
}
