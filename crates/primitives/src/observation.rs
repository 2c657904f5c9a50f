//! Panel and accounting record definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Date, EntityId, Exchange, FirmId, Period, finite};

/// One entity in one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Security identifier.
    pub entity: EntityId,
    /// Firm identifier, if known.
    pub firm: Option<FirmId>,
    /// Month of the observation.
    pub period: Period,
    /// Return over the month.
    pub ret: Option<f64>,
    /// Market capitalization at the end of the month.
    pub market_cap: Option<f64>,
    /// Aggregation weight, taken from the prior month.
    pub weight: Option<f64>,
    /// Listing exchange.
    pub exchange: Option<Exchange>,
    /// Named characteristics; an absent key is undefined.
    pub characteristics: BTreeMap<String, f64>,
}

impl Observation {
    /// Create an observation with every field undefined.
    #[must_use]
    pub const fn new(entity: EntityId, period: Period) -> Self {
        Self {
            entity,
            firm: None,
            period,
            ret: None,
            market_cap: None,
            weight: None,
            exchange: None,
            characteristics: BTreeMap::new(),
        }
    }

    /// Set the firm identifier.
    #[must_use]
    pub fn with_firm(mut self, firm: impl Into<FirmId>) -> Self {
        self.firm = Some(firm.into());
        self
    }

    /// Set the return. Non-finite values leave it undefined.
    #[must_use]
    pub fn with_return(mut self, ret: f64) -> Self {
        self.ret = finite(ret);
        self
    }

    /// Set the market capitalization. Non-finite values leave it undefined.
    #[must_use]
    pub fn with_market_cap(mut self, market_cap: f64) -> Self {
        self.market_cap = finite(market_cap);
        self
    }

    /// Set the aggregation weight. Non-finite values leave it undefined.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = finite(weight);
        self
    }

    /// Set the exchange.
    #[must_use]
    pub fn with_exchange(mut self, exchange: impl Into<Exchange>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    /// Set a characteristic. Non-finite values remove it.
    #[must_use]
    pub fn with_characteristic(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set_characteristic(name, finite(value));
        self
    }

    /// Set or clear a characteristic in place.
    pub fn set_characteristic(&mut self, name: impl Into<String>, value: Option<f64>) {
        let name = name.into();
        match value.and_then(finite) {
            Some(v) => {
                self.characteristics.insert(name, v);
            }
            None => {
                self.characteristics.remove(&name);
            }
        }
    }

    /// Look up a characteristic.
    #[must_use]
    pub fn characteristic(&self, name: &str) -> Option<f64> {
        self.characteristics.get(name).copied()
    }

    /// Whether the observation trades on one of `exchanges`.
    #[must_use]
    pub fn listed_on(&self, exchanges: &[Exchange]) -> bool {
        self.exchange.as_ref().is_some_and(|e| exchanges.contains(e))
    }
}

/// A low-frequency accounting report for one firm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountingRecord {
    /// Reporting firm.
    pub firm: FirmId,
    /// Fiscal period end (e.g. Compustat `datadate`).
    pub report_date: Date,
    /// Reported values by name.
    pub values: BTreeMap<String, f64>,
}

impl AccountingRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new(firm: impl Into<FirmId>, report_date: Date) -> Self {
        Self { firm: firm.into(), report_date, values: BTreeMap::new() }
    }

    /// Add a value. Non-finite values are dropped.
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        if let Some(v) = finite(value) {
            self.values.insert(name.into(), v);
        }
        self
    }
}

/// Security-to-firm link valid over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Security side of the link.
    pub entity: EntityId,
    /// Firm side of the link.
    pub firm: FirmId,
    /// First day the link is valid.
    pub valid_from: Date,
    /// Last day the link is valid; open-ended when `None`.
    pub valid_to: Option<Date>,
}

impl LinkRecord {
    /// Create a new link.
    #[must_use]
    pub fn new(
        entity: EntityId,
        firm: impl Into<FirmId>,
        valid_from: Date,
        valid_to: Option<Date>,
    ) -> Self {
        Self { entity, firm: firm.into(), valid_from, valid_to }
    }

    /// Whether the link is valid at the end of `period`.
    #[must_use]
    pub fn covers(&self, period: &Period) -> bool {
        let month_end = period.last_day();
        self.valid_from <= month_end && self.valid_to.is_none_or(|end| month_end <= end)
    }
}
