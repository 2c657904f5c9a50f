//! Identifier type definitions.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Stable security identifier (e.g. a CRSP permno).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into, Serialize, Deserialize,
)]
pub struct EntityId(pub i64);

impl EntityId {
    /// Create a new entity ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

/// Firm identifier (e.g. a Compustat gvkey).
///
/// Several securities may share one firm.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
pub struct FirmId(pub String);

impl FirmId {
    /// Create a new firm ID.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the firm ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FirmId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FirmId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Primary listing exchange.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
pub struct Exchange(pub String);

impl Exchange {
    /// Create a new exchange label.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the exchange as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Exchange {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn firm_from_str() {
        let firm: FirmId = "001690".into();
        assert_eq!(firm.as_str(), "001690");
    }

    #[test]
    fn entity_ids_order_numerically() {
        assert!(EntityId::new(9) < EntityId::new(10));
        assert_eq!(EntityId::from(14593).to_string(), "14593");
    }
}
