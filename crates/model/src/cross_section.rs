//! Single-period cross-sectional regressions.

use ndarray::{Array1, Array2, Axis, s};
use portsort_math::{MathError, ordinary_least_squares, winsorize};
use portsort_traits::{CrossSectionEstimator, EstimatorError};

/// Configuration for the cross-sectional OLS fit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CrossSectionConfig {
    /// Winsorize each characteristic at this percentile before fitting
    /// (None to disable).
    pub winsorize: Option<f64>,
}

/// OLS of the response on an intercept plus characteristics.
#[derive(Debug, Clone, Default)]
pub struct OlsCrossSection {
    config: CrossSectionConfig,
}

impl OlsCrossSection {
    /// Create an estimator with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CrossSectionConfig::default())
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &CrossSectionConfig {
        &self.config
    }
}

impl CrossSectionEstimator for OlsCrossSection {
    type Config = CrossSectionConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn estimate_single(
        &self,
        response: &Array1<f64>,
        regressors: &Array2<f64>,
    ) -> Result<(Array1<f64>, Array1<f64>), EstimatorError> {
        let n = response.len();
        let k = regressors.ncols();

        if regressors.nrows() != n {
            return Err(EstimatorError::DimensionMismatch {
                expected: n,
                actual: regressors.nrows(),
                context: "regressors".to_string(),
            });
        }

        let mut design = Array2::ones((n, k + 1));
        design.slice_mut(s![.., 1..]).assign(regressors);

        if let Some(pct) = self.config.winsorize {
            for mut column in design.slice_mut(s![.., 1..]).axis_iter_mut(Axis(1)) {
                let clipped = winsorize(&column.to_owned(), pct)
                    .map_err(|e| EstimatorError::InvalidConfig(e.to_string()))?;
                column.assign(&clipped);
            }
        }

        let fit = ordinary_least_squares(response, &design).map_err(|err| match err {
            MathError::Singular { .. } => EstimatorError::Singular { columns: k + 1 },
            MathError::InsufficientData { required, actual } => {
                EstimatorError::InsufficientData { required, actual }
            }
            MathError::EmptyData => EstimatorError::InsufficientData { required: k + 1, actual: 0 },
            other => EstimatorError::LinearAlgebra(other.to_string()),
        })?;

        Ok((fit.coefficients, fit.residuals))
    }
}
