//! The monthly entity panel.

use std::collections::{BTreeMap, BTreeSet};

use portsort_primitives::{EntityId, Observation, Period};

use crate::PanelError;

/// Monthly observations, unique per (entity, period).
///
/// Rows are kept sorted by entity, then period, so each entity's history is a
/// contiguous, chronologically ordered run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Panel {
    observations: Vec<Observation>,
}

impl Panel {
    /// Build a panel, sorting the rows.
    ///
    /// # Errors
    /// Returns `PanelError::DuplicateObservation` if an entity appears twice
    /// in the same month.
    pub fn new(mut observations: Vec<Observation>) -> Result<Self, PanelError> {
        observations.sort_by(|a, b| (a.entity, a.period).cmp(&(b.entity, b.period)));

        if let Some(pair) = observations
            .windows(2)
            .find(|w| w[0].entity == w[1].entity && w[0].period == w[1].period)
        {
            return Err(PanelError::DuplicateObservation {
                entity: pair[0].entity,
                period: pair[0].period,
            });
        }

        Ok(Self { observations })
    }

    /// Rebuild from rows that already satisfy the ordering invariant.
    pub(crate) const fn from_sorted(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    /// All rows, ordered by entity then period.
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Consume the panel, returning its rows.
    #[must_use]
    pub fn into_observations(self) -> Vec<Observation> {
        self.observations
    }

    /// Number of rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.observations.len()
    }

    /// Check if empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Look up one entity-month.
    #[must_use]
    pub fn get(&self, entity: EntityId, period: Period) -> Option<&Observation> {
        self.observations
            .binary_search_by(|o| (o.entity, o.period).cmp(&(entity, period)))
            .ok()
            .map(|i| &self.observations[i])
    }

    /// Distinct months, ascending.
    #[must_use]
    pub fn periods(&self) -> BTreeSet<Period> {
        self.observations.iter().map(|o| o.period).collect()
    }

    /// Distinct entities, ascending.
    #[must_use]
    pub fn entities(&self) -> BTreeSet<EntityId> {
        self.observations.iter().map(|o| o.entity).collect()
    }

    /// Rows grouped by month; entities within a month keep ascending order.
    #[must_use]
    pub fn by_period(&self) -> BTreeMap<Period, Vec<&Observation>> {
        let mut grouped: BTreeMap<Period, Vec<&Observation>> = BTreeMap::new();
        for obs in &self.observations {
            grouped.entry(obs.period).or_default().push(obs);
        }
        grouped
    }

    /// Contiguous per-entity histories.
    pub fn histories(&self) -> impl Iterator<Item = &[Observation]> {
        self.observations.chunk_by(|a, b| a.entity == b.entity)
    }

    /// Apply `f` to each entity history, producing a new panel.
    ///
    /// `f` receives the original rows and a mutable copy to edit; it must not
    /// change entities or periods.
    pub(crate) fn map_histories<F>(&self, f: F) -> Self
    where
        F: Fn(&[Observation], &mut [Observation]),
    {
        let mut out = self.observations.clone();
        let mut start = 0;
        for history in self.histories() {
            let end = start + history.len();
            f(history, &mut out[start..end]);
            start = end;
        }
        Self::from_sorted(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(entity: i64, year: i32, month: u32) -> Observation {
        Observation::new(EntityId::new(entity), Period::new(year, month).unwrap())
    }

    #[test]
    fn rows_sorted_by_entity_then_period() {
        let panel = Panel::new(vec![obs(2, 2020, 1), obs(1, 2020, 2), obs(1, 2020, 1)]).unwrap();
        let keys: Vec<(i64, u32)> =
            panel.observations().iter().map(|o| (o.entity.0, o.period.month())).collect();
        assert_eq!(keys, vec![(1, 1), (1, 2), (2, 1)]);
    }

    #[test]
    fn duplicates_rejected() {
        let err = Panel::new(vec![obs(1, 2020, 1), obs(1, 2020, 1)]).unwrap_err();
        assert!(matches!(err, PanelError::DuplicateObservation { .. }));
    }

    #[test]
    fn lookup_and_grouping() {
        let panel = Panel::new(vec![obs(1, 2020, 1), obs(2, 2020, 1), obs(1, 2020, 2)]).unwrap();

        assert!(panel.get(EntityId::new(2), Period::new(2020, 1).unwrap()).is_some());
        assert!(panel.get(EntityId::new(2), Period::new(2020, 2).unwrap()).is_none());

        let grouped = panel.by_period();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&Period::new(2020, 1).unwrap()].len(), 2);
        assert_eq!(panel.histories().count(), 2);
        assert_eq!(panel.entities().len(), 2);
    }
}
