//! Descriptive moments over finite samples.
//!
//! Every function here expects finite inputs; callers filter missing values
//! first. Undefined results are `NaN`.

/// Whether every value equals the first one. Empty input counts as constant.
pub fn is_constant(values: &[f64]) -> bool {
    values.first().is_none_or(|first| values.iter().all(|v| v == first))
}

/// Arithmetic mean, `NaN` for empty input.
///
/// Accumulates deviations from the first value, so a constant sample returns
/// exactly that value.
pub fn mean(values: &[f64]) -> f64 {
    let Some(&first) = values.first() else {
        return f64::NAN;
    };
    first + values.iter().map(|v| v - first).sum::<f64>() / values.len() as f64
}

/// Sample variance (denominator n-1), `NaN` below two values.
///
/// A constant sample has variance exactly 0 regardless of rounding in the
/// mean.
pub fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    if is_constant(values) {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Sample standard deviation (denominator n-1), `NaN` below two values.
pub fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Population central moments `(m2, m3, m4)` with denominator n.
///
/// Returns `None` for empty or constant samples.
pub fn central_moments(values: &[f64]) -> Option<(f64, f64, f64)> {
    if values.is_empty() || is_constant(values) {
        return None;
    }
    let n = values.len() as f64;
    let m = mean(values);
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    Some((m2 / n, m3 / n, m4 / n))
}

/// Linear-interpolated quantile of an ascending sorted sample.
///
/// Uses the `(n - 1) * q` position (type 7), so `q = 0.5` is the median.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return f64::NAN;
    }
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Quantile of an unsorted sample.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}
