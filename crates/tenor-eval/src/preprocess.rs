//! Cross-sectional factor preprocessing.
//!
//! Applied independently to each timestamp's non-missing values: outlier
//! clipping first, z-scoring second. Missing cells stay missing.

use crate::config::{PreprocessConfig, Winsorize};
use crate::error::Result;
use ndarray::parallel::prelude::*;
use ndarray::{ArrayView1, ArrayViewMut1, Axis};
use tenor_data::FactorPanel;
use tenor_stats::moments::{mean, quantile, sample_std};
use tracing::debug;

/// Apply the configured preprocessing to every row of a factor panel.
///
/// Returns a new panel with the same axes; the input is left untouched.
///
/// # Errors
/// Fails if the configuration is invalid.
pub fn preprocess(factor: &FactorPanel, config: &PreprocessConfig) -> Result<FactorPanel> {
    config.validate()?;
    let mut values = factor.values().clone();
    if !config.is_enabled() {
        return Ok(factor.with_values(values)?);
    }

    values
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .for_each(|row| preprocess_row(row, config));

    let processed = factor.with_values(values)?;
    debug!(
        winsorize = ?config.winsorize,
        standardize = config.standardize,
        defined_before = factor.observation_count(),
        defined_after = processed.observation_count(),
        "preprocessed factor panel"
    );
    Ok(processed)
}

fn preprocess_row(mut row: ArrayViewMut1<'_, f64>, config: &PreprocessConfig) {
    let mut values = row.to_vec();
    if let Some(method) = config.winsorize {
        values = winsorize(&values, method);
    }
    if config.standardize {
        values = standardize(&values);
    }
    row.assign(&ArrayView1::from(values.as_slice()));
}

fn present(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

fn clip_bounds(values: &[f64], method: Winsorize) -> (f64, f64) {
    match method {
        Winsorize::Std { n_std } => {
            let mu = mean(values);
            let sigma = sample_std(values);
            (mu - n_std * sigma, mu + n_std * sigma)
        }
        Winsorize::Quantile { lower, upper } => (quantile(values, lower), quantile(values, upper)),
    }
}

/// Clip one cross-section of values, `NaN` entries untouched.
///
/// Left unchanged when the bounds are undefined (too few values).
pub fn winsorize(values: &[f64], method: Winsorize) -> Vec<f64> {
    let (lower, upper) = clip_bounds(&present(values), method);
    if !(lower.is_finite() && upper.is_finite()) {
        return values.to_vec();
    }
    values
        .iter()
        .map(|v| if v.is_finite() { v.clamp(lower, upper) } else { *v })
        .collect()
}

/// Z-score one cross-section; all `NaN` when fewer than two values or zero
/// dispersion.
pub fn standardize(values: &[f64]) -> Vec<f64> {
    let present = present(values);
    let mu = mean(&present);
    let sigma = sample_std(&present);
    if sigma > 0.0 {
        values.iter().map(|v| (v - mu) / sigma).collect()
    } else {
        vec![f64::NAN; values.len()]
    }
}
