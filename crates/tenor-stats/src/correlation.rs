//! Cross-sectional correlation kernels.
//!
//! Pearson correlation is computed with centred two-pass sums. Spearman
//! correlation is Pearson over [`fractional_rank`]s. A degenerate input
//! (too few points, a constant vector, non-finite values) is never an error
//! at the batch level: [`correlate`] reports `NaN`, while the `try_*`
//! variants say why the value is undefined.

use crate::moments::{is_constant, mean};
use crate::rank::fractional_rank;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default minimum number of pairs for a defined correlation.
pub const DEFAULT_MIN_COUNT: usize = 3;

/// Why a correlation is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Undefined {
    /// Fewer pairs than the configured minimum
    #[error("Insufficient sample: need at least {required} pairs, got {actual}")]
    InsufficientSample {
        /// Required number of pairs
        required: usize,
        /// Pairs available
        actual: usize,
    },

    /// One of the vectors has zero variance
    #[error("Degenerate distribution: zero variance")]
    DegenerateDistribution,

    /// The vectors have different lengths
    #[error("Length mismatch: {left} vs {right}")]
    LengthMismatch {
        /// Length of the first vector
        left: usize,
        /// Length of the second vector
        right: usize,
    },

    /// A value is NaN or infinite
    #[error("Non-finite input")]
    NonFinite,
}

/// Correlation flavour used for an IC series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    /// Sample Pearson correlation (IC)
    #[default]
    Pearson = 0,
    /// Spearman rank correlation (Rank IC)
    Spearman = 1,
}

type Kernel = fn(&[f64], &[f64], usize) -> Result<f64, Undefined>;

// Indexed by the enum discriminant.
const KERNELS: [Kernel; 2] = [try_pearson, try_spearman];

impl CorrelationMethod {
    /// Both methods.
    pub const ALL: [Self; 2] = [Self::Pearson, Self::Spearman];

    /// Canonical lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pearson => "pearson",
            Self::Spearman => "spearman",
        }
    }

    /// Correlate two vectors, reporting why the result is undefined.
    pub fn try_correlate(self, x: &[f64], y: &[f64], min_count: usize) -> Result<f64, Undefined> {
        KERNELS[self as usize](x, y, min_count)
    }

    /// Correlate two vectors, `NaN` when undefined.
    pub fn correlate(self, x: &[f64], y: &[f64], min_count: usize) -> f64 {
        self.try_correlate(x, y, min_count).unwrap_or(f64::NAN)
    }
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown correlation method name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown correlation method: {0}")]
pub struct UnknownCorrelation(pub String);

impl FromStr for CorrelationMethod {
    type Err = UnknownCorrelation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pearson" | "ic" => Ok(Self::Pearson),
            "spearman" | "rank" | "rank_ic" => Ok(Self::Spearman),
            _ => Err(UnknownCorrelation(s.to_string())),
        }
    }
}

/// Correlate with the given method, `NaN` when undefined.
pub fn correlate(x: &[f64], y: &[f64], method: CorrelationMethod, min_count: usize) -> f64 {
    method.correlate(x, y, min_count)
}

fn check_inputs(x: &[f64], y: &[f64], min_count: usize) -> Result<(), Undefined> {
    if x.len() != y.len() {
        return Err(Undefined::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    let required = min_count.max(2);
    if x.len() < required {
        return Err(Undefined::InsufficientSample {
            required,
            actual: x.len(),
        });
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(Undefined::NonFinite);
    }
    if is_constant(x) || is_constant(y) {
        return Err(Undefined::DegenerateDistribution);
    }
    Ok(())
}

fn centred_correlation(x: &[f64], y: &[f64]) -> Result<f64, Undefined> {
    let mx = mean(x);
    let my = mean(y);
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return Err(Undefined::DegenerateDistribution);
    }
    Ok((sxy / denom).clamp(-1.0, 1.0))
}

/// Sample Pearson correlation.
///
/// # Errors
/// Undefined below `min_count` pairs (never fewer than 2), for constant
/// vectors, non-finite values or mismatched lengths.
pub fn try_pearson(x: &[f64], y: &[f64], min_count: usize) -> Result<f64, Undefined> {
    check_inputs(x, y, min_count)?;
    centred_correlation(x, y)
}

/// Spearman rank correlation: Pearson over fractional ranks.
///
/// # Errors
/// Same conditions as [`try_pearson`], checked on the raw values.
pub fn try_spearman(x: &[f64], y: &[f64], min_count: usize) -> Result<f64, Undefined> {
    check_inputs(x, y, min_count)?;
    centred_correlation(&fractional_rank(x), &fractional_rank(y))
}

/// Sample Pearson correlation, `NaN` when undefined.
pub fn pearson(x: &[f64], y: &[f64], min_count: usize) -> f64 {
    try_pearson(x, y, min_count).unwrap_or(f64::NAN)
}

/// Spearman rank correlation, `NaN` when undefined.
pub fn spearman(x: &[f64], y: &[f64], min_count: usize) -> f64 {
    try_spearman(x, y, min_count).unwrap_or(f64::NAN)
}
