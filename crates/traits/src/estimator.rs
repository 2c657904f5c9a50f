//! Estimation trait definitions.

use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Errors that can occur during estimation.
#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    /// Dimension mismatch in input data.
    #[error("dimension mismatch for {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
        /// Context description.
        context: String,
    },

    /// Insufficient data for estimation.
    #[error("insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations.
        required: usize,
        /// Actual number of observations.
        actual: usize,
    },

    /// Singular or near-singular design matrix.
    #[error("singular design matrix with {columns} columns")]
    Singular {
        /// Number of columns.
        columns: usize,
    },

    /// Polars error.
    #[error("data processing error: {0}")]
    Polars(#[from] PolarsError),

    /// Missing required column.
    #[error("missing required column: {0}")]
    MissingColumn(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Linear algebra error.
    #[error("linear algebra error: {0}")]
    LinearAlgebra(String),
}

impl EstimatorError {
    /// Returns whether this error only affects a single period.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::InsufficientData { .. } | Self::Singular { .. })
    }
}

/// Estimates coefficients for a single cross-section.
pub trait CrossSectionEstimator: Send + Sync {
    /// Configuration type for this estimator.
    type Config: Default + Clone + Send + Sync;

    /// Create a new estimator with the given configuration.
    fn with_config(config: Self::Config) -> Self;

    /// Fit one cross-section.
    ///
    /// # Arguments
    /// * `response` - Dependent variable (n_entities,)
    /// * `regressors` - Characteristics without a constant column (n_entities x k)
    ///
    /// # Returns
    /// Tuple of (coefficients with the intercept first (k + 1,), residuals (n_entities,))
    ///
    /// # Errors
    /// Returns `EstimatorError` if dimensions mismatch, there are too few
    /// observations, or the design is singular.
    fn estimate_single(
        &self,
        response: &Array1<f64>,
        regressors: &Array2<f64>,
    ) -> Result<(Array1<f64>, Array1<f64>), EstimatorError>;
}

/// Standard error of the mean of a time series.
pub trait StandardErrorEstimator: Send + Sync {
    /// Standard error of the sample mean of `series`.
    ///
    /// # Errors
    /// Returns `EstimatorError::InsufficientData` when the series is too short.
    fn standard_error(&self, series: &[f64]) -> Result<f64, EstimatorError>;

    /// Returns the name of this estimator.
    fn name(&self) -> &str;
}

/// Estimates time-averaged cross-sectional coefficients from a panel frame.
pub trait PanelEstimator: Send + Sync {
    /// Run the estimator over every period of the panel.
    ///
    /// # Arguments
    /// * `panel` - Frame with a period column, an entity column, the response
    ///   and one column per characteristic
    ///
    /// # Returns
    /// Tuple of (per-period coefficients frame, summary frame)
    ///
    /// # Errors
    /// Returns `EstimatorError` if required columns are missing or have the
    /// wrong type.
    fn estimate(&self, panel: LazyFrame) -> Result<(DataFrame, DataFrame), EstimatorError>;

    /// Names of the estimated terms, intercept first.
    fn terms(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimator_error_is_recoverable() {
        let err = EstimatorError::InsufficientData { required: 10, actual: 5 };
        assert!(err.is_recoverable());

        let err = EstimatorError::Singular { columns: 3 };
        assert!(err.is_recoverable());

        let err = EstimatorError::MissingColumn("ret_excess".to_string());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn estimator_error_display() {
        let err = EstimatorError::DimensionMismatch {
            expected: 100,
            actual: 50,
            context: "regressors".to_string(),
        };
        assert_eq!(err.to_string(), "dimension mismatch for regressors: expected 100, got 50");
    }
}
