//! Time-series statistics for coefficient and spread series.
//!
//! The Newey-West estimator of the variance of a sample mean adds lagged
//! autocovariances with Bartlett kernel weights:
//! ```text
//! S   = g_0 + 2 * sum_{l=1}^{L} w_l * g_l
//! g_l = (1/T) * sum_{t=l+1}^{T} (x_t - m)(x_{t-l} - m)
//! w_l = 1 - l/(L+1)
//! SE  = sqrt(S / T)
//! ```
//!
//! # References
//! - Newey, W. K., & West, K. D. (1987). "A Simple, Positive Semi-Definite,
//!   Heteroskedasticity and Autocorrelation Consistent Covariance Matrix."
//!   Econometrica, 55(3), 703-708.
//! - Andrews, D. W. K., & Monahan, J. C. (1992). "An Improved
//!   Heteroskedasticity and Autocorrelation Consistent Covariance Matrix
//!   Estimator." Econometrica, 60(4), 953-966.

use crate::MathError;

/// Largest AR(1) coefficient allowed when prewhitening.
const MAX_PREWHITEN_RHO: f64 = 0.97;

/// Arithmetic mean, `None` for an empty slice.
#[must_use]
pub fn mean(series: &[f64]) -> Option<f64> {
    if series.is_empty() { None } else { Some(series.iter().sum::<f64>() / series.len() as f64) }
}

/// Sample standard deviation with an `n - 1` denominator.
///
/// # Errors
/// Returns `MathError::InsufficientData` with fewer than two observations.
pub fn sample_std(series: &[f64]) -> Result<f64, MathError> {
    let n = series.len();
    if n < 2 {
        return Err(MathError::InsufficientData { required: 2, actual: n });
    }
    let m = series.iter().sum::<f64>() / n as f64;
    let variance = series.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    Ok(variance.sqrt())
}

/// Naive standard error of the mean: sample sd / sqrt(T).
///
/// # Errors
/// Returns `MathError::InsufficientData` with fewer than two observations.
pub fn naive_standard_error(series: &[f64]) -> Result<f64, MathError> {
    Ok(sample_std(series)? / (series.len() as f64).sqrt())
}

/// Bartlett kernel weight for `lag` under truncation `max_lag`.
#[must_use]
pub fn bartlett_weight(lag: usize, max_lag: usize) -> f64 {
    if lag == 0 {
        1.0
    } else if lag <= max_lag {
        1.0 - (lag as f64) / (max_lag as f64 + 1.0)
    } else {
        0.0
    }
}

/// Newey-West standard error of the mean of `series`.
///
/// `lags` is the Bartlett truncation and is clamped to `T - 1`. With
/// `prewhiten`, the demeaned series is first filtered through an AR(1), the
/// long-run variance of the filtered residuals is estimated and then recolored
/// by `1 / (1 - rho)^2`.
///
/// With `lags = 0` and no prewhitening this is the heteroskedasticity-only
/// standard error `sqrt(g_0 / T)`.
///
/// # Errors
/// Returns `MathError::InsufficientData` with fewer than two observations, or
/// fewer than three when prewhitening.
pub fn newey_west_standard_error(
    series: &[f64],
    lags: usize,
    prewhiten: bool,
) -> Result<f64, MathError> {
    let n = series.len();
    let required = if prewhiten { 3 } else { 2 };
    if n < required {
        return Err(MathError::InsufficientData { required, actual: n });
    }

    let m = series.iter().sum::<f64>() / n as f64;
    let demeaned: Vec<f64> = series.iter().map(|x| x - m).collect();

    let long_run = if prewhiten {
        let rho = ar1_coefficient(&demeaned);
        let filtered: Vec<f64> = demeaned.windows(2).map(|w| w[1] - rho * w[0]).collect();
        long_run_variance(&filtered, lags) / (1.0 - rho).powi(2)
    } else {
        long_run_variance(&demeaned, lags)
    };

    Ok((long_run / n as f64).sqrt())
}

/// Bartlett-weighted long-run variance of an already centered series.
fn long_run_variance(centered: &[f64], lags: usize) -> f64 {
    let t = centered.len();
    let max_lag = lags.min(t.saturating_sub(1));

    let autocovariance = |lag: usize| -> f64 {
        centered[lag..].iter().zip(centered).map(|(a, b)| a * b).sum::<f64>() / t as f64
    };

    let mut total = autocovariance(0);
    for lag in 1..=max_lag {
        total += 2.0 * bartlett_weight(lag, max_lag) * autocovariance(lag);
    }

    // Bartlett weights keep this non-negative up to rounding
    total.max(0.0)
}

/// Least squares AR(1) coefficient without intercept, clamped for stability.
fn ar1_coefficient(centered: &[f64]) -> f64 {
    let numerator: f64 = centered.windows(2).map(|w| w[1] * w[0]).sum();
    let denominator: f64 = centered[..centered.len() - 1].iter().map(|x| x * x).sum();
    if denominator > 0.0 {
        (numerator / denominator).clamp(-MAX_PREWHITEN_RHO, MAX_PREWHITEN_RHO)
    } else {
        0.0
    }
}

/// Ratio of an estimate to its standard error.
///
/// `None` when the standard error is zero or not finite.
#[must_use]
pub fn t_statistic(estimate: f64, standard_error: f64) -> Option<f64> {
    if standard_error > 0.0 && standard_error.is_finite() {
        Some(estimate / standard_error)
    } else {
        None
    }
}

/// Weighted mean `sum(w * x) / sum(w)`.
///
/// `None` when the slices are empty, of unequal length, or the weights sum
/// to zero or less.
#[must_use]
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> Option<f64> {
    if values.is_empty() || values.len() != weights.len() {
        return None;
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }
    Some(values.iter().zip(weights).map(|(x, w)| x * w).sum::<f64>() / total)
}

/// Pearson correlation of paired observations.
///
/// `None` with fewer than two pairs or a constant series.
#[must_use]
pub fn correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = x.iter().sum::<f64>() / x.len() as f64;
    let my = y.iter().sum::<f64>() / y.len() as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }

    let denominator = (sxx * syy).sqrt();
    if denominator > 0.0 { Some(sxy / denominator) } else { None }
}
