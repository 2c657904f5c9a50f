//! Accounting record collections.

use std::collections::{BTreeMap, BTreeSet};

use portsort_primitives::{AccountingRecord, FirmId};

/// Accounting records grouped by firm, each firm's reports in date order.
#[derive(Debug, Clone, Default)]
pub struct AccountingTable {
    by_firm: BTreeMap<FirmId, Vec<AccountingRecord>>,
}

impl AccountingTable {
    /// Group records by firm.
    #[must_use]
    pub fn new(records: Vec<AccountingRecord>) -> Self {
        let mut by_firm: BTreeMap<FirmId, Vec<AccountingRecord>> = BTreeMap::new();
        for record in records {
            by_firm.entry(record.firm.clone()).or_default().push(record);
        }
        for reports in by_firm.values_mut() {
            reports.sort_by_key(|r| r.report_date);
        }
        Self { by_firm }
    }

    /// Reports of one firm, oldest first.
    #[must_use]
    pub fn reports(&self, firm: &FirmId) -> &[AccountingRecord] {
        self.by_firm.get(firm).map_or(&[], Vec::as_slice)
    }

    /// Iterate over firms and their reports.
    pub fn firms(&self) -> impl Iterator<Item = (&FirmId, &[AccountingRecord])> {
        self.by_firm.iter().map(|(firm, reports)| (firm, reports.as_slice()))
    }

    /// Every value name reported by any firm.
    #[must_use]
    pub fn field_names(&self) -> BTreeSet<String> {
        self.by_firm.values().flatten().flat_map(|r| r.values.keys().cloned()).collect()
    }

    /// Total number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_firm.values().map(Vec::len).sum()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_firm.is_empty()
    }
}
