//! Error types for panel construction.

use portsort_primitives::{EntityId, Period};

/// Errors that can occur while building or joining panels.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// Join keys of the two sides have incompatible types.
    #[error("join key mismatch on {column}: {left} vs {right}")]
    JoinKeyMismatch {
        /// Key column being joined.
        column: String,
        /// Type on the panel side.
        left: String,
        /// Type on the source side.
        right: String,
    },

    /// The same entity appears twice in one month.
    #[error("duplicate observation for entity {entity} in {period}")]
    DuplicateObservation {
        /// Entity.
        entity: EntityId,
        /// Month.
        period: Period,
    },

    /// Missing required column.
    #[error("missing required column: {0}")]
    MissingColumn(String),

    /// Column has an unsupported type.
    #[error("column {column} has type {actual}, expected {expected}")]
    ColumnType {
        /// Column name.
        column: String,
        /// Expected type.
        expected: String,
        /// Actual type.
        actual: String,
    },

    /// Required key value is null.
    #[error("null key in column {column} at row {row}")]
    NullKey {
        /// Column name.
        column: String,
        /// Row index.
        row: usize,
    },

    /// A characteristic has the same name as another panel column.
    #[error("characteristic {0} clashes with a panel column")]
    ColumnClash(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Polars error.
    #[error("polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}
