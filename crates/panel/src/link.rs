//! Security-to-firm links.

use std::collections::BTreeMap;

use portsort_primitives::{EntityId, FirmId, LinkRecord, Period};

/// Links from securities to firms with validity windows.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    by_entity: BTreeMap<EntityId, Vec<LinkRecord>>,
}

impl LinkTable {
    /// Group links by entity.
    #[must_use]
    pub fn new(links: Vec<LinkRecord>) -> Self {
        let mut by_entity: BTreeMap<EntityId, Vec<LinkRecord>> = BTreeMap::new();
        for link in links {
            by_entity.entry(link.entity).or_default().push(link);
        }
        // Most recent link first, firm id as the tie-breaker
        for links in by_entity.values_mut() {
            links.sort_by(|a, b| b.valid_from.cmp(&a.valid_from).then_with(|| a.firm.cmp(&b.firm)));
        }
        Self { by_entity }
    }

    /// Firm linked to `entity` at the end of `period`.
    ///
    /// When windows overlap, the link that started most recently wins.
    #[must_use]
    pub fn firm_at(&self, entity: EntityId, period: &Period) -> Option<&FirmId> {
        self.by_entity.get(&entity)?.iter().find(|link| link.covers(period)).map(|link| &link.firm)
    }

    /// Number of links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_entity.values().map(Vec::len).sum()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_entity.is_empty()
    }
}
