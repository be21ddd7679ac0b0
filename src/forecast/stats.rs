//! Small statistics helpers shared by the estimators.

use rand::Rng;
use std::f64::consts::PI;

/// Standard deviation used when a sample is too small to estimate one
pub const DEFAULT_STD_DEV: f64 = 0.5;

/// Arithmetic mean; `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (`n - 1` denominator).
///
/// Returns [`DEFAULT_STD_DEV`] for one value or fewer.
pub fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() <= 1 {
        return DEFAULT_STD_DEV;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Population coefficient of variation (`stddev / mean`).
///
/// Returns `0.0` for empty input or a mean of zero.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if values.is_empty() || m.abs() < f64::EPSILON {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt() / m.abs()
}

/// Standard normal sample via the Box-Muller transform.
pub fn normal_random<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // gen::<f64>() is in [0, 1); flip it to (0, 1] so ln(u) is finite
    let u = 1.0 - rng.gen::<f64>();
    let v = 1.0 - rng.gen::<f64>();
    (-2.0 * u.ln()).sqrt() * (2.0 * PI * v).cos()
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
