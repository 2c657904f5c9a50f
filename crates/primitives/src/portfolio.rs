//! Portfolio assignment and return definitions.

use std::fmt;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{EntityId, Period};

/// One-based bucket number along a single sorting variable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
pub struct Bucket(u16);

impl Bucket {
    /// Create a bucket; bucket numbers start at one.
    #[must_use]
    pub const fn new(number: u16) -> Option<Self> {
        if number == 0 { None } else { Some(Self(number)) }
    }

    /// Bucket for a zero-based position, saturating at `u16::MAX`.
    #[must_use]
    pub const fn from_index(index: u16) -> Self {
        Self(index.saturating_add(1))
    }

    /// The bucket number.
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }
}

/// Composite portfolio identifier.
///
/// Ordered numerically by primary then secondary bucket, so `(2, 10)` sorts
/// after `(2, 9)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortfolioKey {
    /// Bucket along the first sorting variable.
    pub primary: Bucket,
    /// Bucket along the second sorting variable, for bivariate sorts.
    pub secondary: Option<Bucket>,
}

impl PortfolioKey {
    /// Key for a univariate sort.
    #[must_use]
    pub const fn single(primary: Bucket) -> Self {
        Self { primary, secondary: None }
    }

    /// Key for a bivariate sort.
    #[must_use]
    pub const fn pair(primary: Bucket, secondary: Bucket) -> Self {
        Self { primary, secondary: Some(secondary) }
    }
}

impl fmt::Display for PortfolioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.secondary {
            Some(secondary) => write!(f, "{}-{}", self.primary, secondary),
            None => write!(f, "{}", self.primary),
        }
    }
}

/// Portfolio membership of one entity in one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioAssignment {
    /// Assigned entity.
    pub entity: EntityId,
    /// Month the assignment applies to.
    pub period: Period,
    /// Portfolio the entity belongs to.
    pub key: PortfolioKey,
}

/// Weighted-average return of one portfolio in one month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReturn {
    /// Month of the return.
    pub period: Period,
    /// Portfolio identifier.
    pub key: PortfolioKey,
    /// Weighted-average return.
    pub ret: f64,
    /// Sum of the weights used.
    pub total_weight: f64,
    /// Number of constituents contributing.
    pub constituents: usize,
}
