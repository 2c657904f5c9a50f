//! Annual rebalancing cycles.
//!
//! A sorting variable formed in month `m` of year `y` is held from month
//! `m + 1` of `y` through month `m` of `y + 1`. With June formation this is
//! the familiar July-to-June holding year.

use std::collections::BTreeMap;

use portsort_primitives::Period;

use crate::{Panel, PanelError};

/// Where, relative to the formation year, a characteristic is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotRule {
    /// Calendar month (1-12) of the snapshot.
    pub month: u32,
    /// Years relative to the formation year; `-1` samples the prior year.
    pub year_offset: i32,
}

impl SnapshotRule {
    /// Sample in the formation month itself.
    #[must_use]
    pub const fn at_formation(month: u32) -> Self {
        Self { month, year_offset: 0 }
    }

    /// Sample in `month` of the year before formation.
    #[must_use]
    pub const fn prior_year(month: u32) -> Self {
        Self { month, year_offset: -1 }
    }
}

/// Annual rebalancing schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebalanceCycle {
    formation_month: u32,
}

impl Default for RebalanceCycle {
    fn default() -> Self {
        Self { formation_month: 6 }
    }
}

impl RebalanceCycle {
    /// Create a cycle that forms portfolios at the end of `formation_month`.
    ///
    /// # Errors
    /// Returns `PanelError::InvalidConfig` if the month is outside 1-12.
    pub fn new(formation_month: u32) -> Result<Self, PanelError> {
        if !(1..=12).contains(&formation_month) {
            return Err(PanelError::InvalidConfig(format!(
                "formation month must be in 1-12, got {formation_month}"
            )));
        }
        Ok(Self { formation_month })
    }

    /// Formation month.
    #[must_use]
    pub const fn formation_month(&self) -> u32 {
        self.formation_month
    }

    /// Formation year of the cycle that holds `period`.
    #[must_use]
    pub fn cycle_of(&self, period: &Period) -> i32 {
        if period.month() > self.formation_month { period.year() } else { period.year() - 1 }
    }

    /// Copy `source` sampled per `rule` into `target` for every month of each cycle.
    ///
    /// The target is undefined when the entity has no row, or no defined
    /// source value, at the snapshot month.
    ///
    /// # Errors
    /// Returns `PanelError::InvalidConfig` if the snapshot month is invalid or
    /// would fall after the formation month.
    pub fn hold(
        &self,
        panel: &Panel,
        source: &str,
        target: &str,
        rule: SnapshotRule,
    ) -> Result<Panel, PanelError> {
        if !(1..=12).contains(&rule.month) {
            return Err(PanelError::InvalidConfig(format!(
                "snapshot month must be in 1-12, got {}",
                rule.month
            )));
        }
        if rule.year_offset > 0 || (rule.year_offset == 0 && rule.month > self.formation_month) {
            return Err(PanelError::InvalidConfig(format!(
                "snapshot {}/{:+} falls after formation month {}",
                rule.month, rule.year_offset, self.formation_month
            )));
        }

        Ok(panel.map_histories(|history, out| {
            let snapshots: BTreeMap<i32, f64> = history
                .iter()
                .filter(|o| o.period.month() == rule.month)
                .filter_map(|o| {
                    let formation_year = o.period.year() - rule.year_offset;
                    o.characteristic(source).map(|v| (formation_year, v))
                })
                .collect();

            for row in out.iter_mut() {
                let held = snapshots.get(&self.cycle_of(&row.period)).copied();
                row.set_characteristic(target, held);
            }
        }))
    }
}
