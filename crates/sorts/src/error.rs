//! Error types for sorting.

use portsort_math::MathError;

/// Errors that can occur while computing breakpoints or sorting.
#[derive(Debug, thiserror::Error)]
pub enum SortError {
    /// No valid reference values to compute breakpoints from.
    #[error("insufficient data for {variable} breakpoints")]
    InsufficientData {
        /// Sorting variable.
        variable: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Math operation error.
    #[error("math error: {0}")]
    Math(#[from] MathError),

    /// Panel error.
    #[error("panel error: {0}")]
    Panel(#[from] portsort_panel::PanelError),

    /// Polars error.
    #[error("polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl SortError {
    /// Returns true if only the affected period or bucket is lost.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}
