//! Error types for return aggregation and risk premium estimation.

use portsort_panel::PanelError;
use portsort_sorts::SortError;
use portsort_traits::EstimatorError;

/// Errors that can occur in the model stage.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Estimator error.
    #[error("estimator error: {0}")]
    Estimator(#[from] EstimatorError),

    /// Panel construction error.
    #[error("panel error: {0}")]
    Panel(#[from] PanelError),

    /// Sorting error.
    #[error("sort error: {0}")]
    Sort(#[from] SortError),

    /// Polars error.
    #[error("data processing error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Configuration could not be parsed.
    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// Too few periods to aggregate.
    #[error("insufficient data: need at least {required} periods, got {actual}")]
    InsufficientData {
        /// Required number of periods.
        required: usize,
        /// Actual number of periods.
        actual: usize,
    },
}

impl ModelError {
    /// Returns whether this error is recoverable.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::InsufficientData { .. } => true,
            Self::Estimator(err) => err.is_recoverable(),
            Self::Sort(err) => err.is_recoverable(),
            _ => false,
        }
    }
}
