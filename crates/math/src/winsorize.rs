//! Winsorization for cross-sectional outlier handling.

use ndarray::Array1;

use crate::{MathError, quantiles};

/// Winsorize a 1D array at symmetric quantiles.
///
/// Values below the `percentile` quantile are raised to it and values above
/// the `1 - percentile` quantile are lowered to it. Quantiles interpolate
/// linearly, like [`quantiles`]. Non-finite entries pass through untouched.
///
/// # Errors
/// Returns `MathError::InvalidPercentile` if percentile is not in (0, 0.5).
pub fn winsorize(data: &Array1<f64>, percentile: f64) -> Result<Array1<f64>, MathError> {
    if percentile <= 0.0 || percentile >= 0.5 {
        return Err(MathError::InvalidPercentile { value: percentile, range: "(0, 0.5)" });
    }

    if !data.iter().any(|x| x.is_finite()) {
        return Ok(data.clone());
    }

    let values = data.to_vec();
    let bounds = quantiles(&values, &[percentile, 1.0 - percentile])?;
    let (lower, upper) = (bounds[0], bounds[1]);

    Ok(data.mapv(|x| if x.is_finite() { x.clamp(lower, upper) } else { x }))
}

/// Winsorization configuration and transform.
#[derive(Debug, Clone, Copy)]
pub struct Winsorizer {
    /// Percentile threshold (e.g., 0.01).
    percentile: f64,
}

impl Winsorizer {
    /// Create a new winsorizer.
    ///
    /// # Arguments
    /// * `percentile` - Must be in (0, 0.5)
    ///
    /// # Errors
    /// Returns `MathError::InvalidPercentile` if percentile is not in valid range.
    pub fn new(percentile: f64) -> Result<Self, MathError> {
        if percentile <= 0.0 || percentile >= 0.5 {
            return Err(MathError::InvalidPercentile { value: percentile, range: "(0, 0.5)" });
        }
        Ok(Self { percentile })
    }

    /// Get the percentile.
    #[must_use]
    pub const fn percentile(&self) -> f64 {
        self.percentile
    }

    /// Apply winsorization to an array.
    ///
    /// # Errors
    /// Returns error if winsorization fails.
    pub fn apply(&self, data: &Array1<f64>) -> Result<Array1<f64>, MathError> {
        winsorize(data, self.percentile)
    }
}
