//! Standard errors of time-series means.

use portsort_math::{MathError, naive_standard_error, newey_west_standard_error};
use portsort_traits::{EstimatorError, StandardErrorEstimator};
use serde::{Deserialize, Serialize};

/// Default Bartlett truncation lag.
pub const DEFAULT_NEWEY_WEST_LAGS: usize = 6;

fn to_estimator_error(err: MathError) -> EstimatorError {
    match err {
        MathError::InsufficientData { required, actual } => {
            EstimatorError::InsufficientData { required, actual }
        }
        other => EstimatorError::LinearAlgebra(other.to_string()),
    }
}

/// Sample standard deviation over `sqrt(T)`, ignoring autocorrelation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveStandardError;

impl StandardErrorEstimator for NaiveStandardError {
    fn standard_error(&self, series: &[f64]) -> Result<f64, EstimatorError> {
        naive_standard_error(series).map_err(to_estimator_error)
    }

    fn name(&self) -> &str {
        "naive"
    }
}

/// Newey-West heteroskedasticity and autocorrelation consistent standard error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeweyWest {
    /// Bartlett truncation lag.
    pub lags: usize,
    /// Filter through an AR(1) before estimating, then recolor.
    pub prewhiten: bool,
}

impl Default for NeweyWest {
    fn default() -> Self {
        Self { lags: DEFAULT_NEWEY_WEST_LAGS, prewhiten: false }
    }
}

impl NeweyWest {
    /// Create with the given truncation lag and no prewhitening.
    #[must_use]
    pub const fn new(lags: usize) -> Self {
        Self { lags, prewhiten: false }
    }

    /// Enable AR(1) prewhitening.
    #[must_use]
    pub const fn with_prewhitening(mut self) -> Self {
        self.prewhiten = true;
        self
    }
}

impl StandardErrorEstimator for NeweyWest {
    fn standard_error(&self, series: &[f64]) -> Result<f64, EstimatorError> {
        newey_west_standard_error(series, self.lags, self.prewhiten).map_err(to_estimator_error)
    }

    fn name(&self) -> &str {
        if self.prewhiten { "newey_west_prewhitened" } else { "newey_west" }
    }
}
