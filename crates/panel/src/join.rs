//! Look-ahead-free joins of accounting data onto a monthly panel.
//!
//! Each accounting record becomes usable in its *effective period*, computed
//! from the report date by an [`AvailabilityRule`]. A row in month `t` sees the
//! most recent vintage of its firm whose effective period is `<= t`, so a
//! report can never reach a month that starts before it was available.

use std::collections::BTreeSet;

use chrono::{Datelike, Months};
use portsort_primitives::{AccountingRecord, Date, EntityId, FirmId, Observation, Period};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{AccountingTable, LinkTable, Panel, PanelError};

/// When a report becomes usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityRule {
    /// Usable from the first month starting on or after `report_date + n` months.
    Months(u32),
    /// Usable from `rebalance_month` of the calendar year after the report,
    /// and never before the `Months(min_lag_months)` rule allows.
    FiscalYearEnd {
        /// Month (1-12) in which new fiscal-year data enters.
        rebalance_month: u32,
        /// Minimum publication lag in months.
        min_lag_months: u32,
    },
}

impl Default for AvailabilityRule {
    fn default() -> Self {
        Self::Months(6)
    }
}

impl AvailabilityRule {
    /// First period in which a report dated `report_date` may be used.
    ///
    /// `None` only when the result falls outside the supported calendar.
    #[must_use]
    pub fn effective_period(&self, report_date: Date) -> Option<Period> {
        match *self {
            Self::Months(months) => {
                let available = report_date.checked_add_months(Months::new(months))?;
                Period::starting_on_or_after(available)
            }
            Self::FiscalYearEnd { rebalance_month, min_lag_months } => {
                let scheduled = Period::new(report_date.year() + 1, rebalance_month)?;
                let earliest = Self::Months(min_lag_months).effective_period(report_date)?;
                Some(scheduled.max(earliest))
            }
        }
    }

    /// Check the rule's parameters.
    ///
    /// # Errors
    /// Returns `PanelError::InvalidConfig` for a rebalance month outside 1-12.
    pub fn validate(&self) -> Result<(), PanelError> {
        match *self {
            Self::FiscalYearEnd { rebalance_month, .. } if !(1..=12).contains(&rebalance_month) => {
                Err(PanelError::InvalidConfig(format!(
                    "rebalance month must be in 1-12, got {rebalance_month}"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Join configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Availability rule for report dates.
    pub availability: AvailabilityRule,
    /// Values older than this many months (measured from the effective
    /// period) become undefined. Unlimited when `None`.
    pub max_staleness_months: Option<u32>,
}

impl JoinConfig {
    /// Check the configuration.
    ///
    /// # Errors
    /// Returns `PanelError::InvalidConfig` if the availability rule is invalid.
    pub fn validate(&self) -> Result<(), PanelError> {
        self.availability.validate()
    }
}

/// Non-fatal problems found while joining.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinIssue {
    /// Two reports with the same date disagree, so the firm's values are
    /// undefined from `effective` until the next vintage.
    AmbiguousVintage {
        /// Firm.
        firm: FirmId,
        /// The shared report date.
        report_date: Date,
        /// Period the conflicting reports would have taken effect.
        effective: Period,
    },
}

/// Result of a temporal join.
#[derive(Debug, Clone)]
pub struct JoinOutput {
    /// Panel with accounting characteristics attached.
    pub panel: Panel,
    /// Recorded issues, ordered by firm.
    pub issues: Vec<JoinIssue>,
    /// Rows with no resolvable firm.
    pub unmatched: usize,
}

/// A vintage in a firm's timeline. `values` is `None` when ambiguous.
#[derive(Debug)]
struct Vintage<'a> {
    effective: Period,
    values: Option<&'a AccountingRecord>,
}

/// Temporal join engine.
#[derive(Debug, Clone, Default)]
pub struct TemporalJoin {
    config: JoinConfig,
}

impl TemporalJoin {
    /// Create a join engine.
    ///
    /// # Errors
    /// Returns `PanelError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: JoinConfig) -> Result<Self, PanelError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &JoinConfig {
        &self.config
    }

    /// Attach every accounting field to every row of `panel`.
    ///
    /// Firms are resolved through `links` when given, otherwise from each
    /// row's own firm id. All field names present anywhere in `accounting`
    /// are written on every row, as `None` where no usable vintage exists,
    /// which makes the join a fixed point when repeated.
    #[must_use]
    pub fn join(
        &self,
        panel: &Panel,
        accounting: &AccountingTable,
        links: Option<&LinkTable>,
    ) -> JoinOutput {
        let fields = accounting.field_names();
        let mut issues = Vec::new();

        let timelines: Vec<(&FirmId, Vec<Vintage<'_>>)> = accounting
            .firms()
            .map(|(firm, reports)| (firm, self.timeline(firm, reports, &mut issues)))
            .collect();

        let lookup = |firm: &FirmId| {
            timelines
                .binary_search_by(|(f, _)| (*f).cmp(firm))
                .ok()
                .map(|i| timelines[i].1.as_slice())
        };

        let observations: Vec<Observation> = panel
            .observations()
            .par_iter()
            .map(|obs| {
                let mut row = obs.clone();
                let firm = match links {
                    Some(table) => table.firm_at(obs.entity, &obs.period).cloned(),
                    None => obs.firm.clone(),
                };
                let vintage =
                    firm.as_ref().and_then(lookup).and_then(|t| self.vintage_at(t, obs.period));
                for field in &fields {
                    let value = vintage.and_then(|r| r.values.get(field).copied());
                    row.set_characteristic(field.as_str(), value);
                }
                row.firm = firm;
                row
            })
            .collect();

        let unmatched = observations.iter().filter(|o| o.firm.is_none()).count();

        info!(
            rows = observations.len(),
            firms = timelines.len(),
            fields = fields.len(),
            unmatched,
            issues = issues.len(),
            "temporal join complete"
        );

        JoinOutput { panel: Panel::from_sorted(observations), issues, unmatched }
    }

    /// Build one firm's vintages ordered by effective period.
    fn timeline<'a>(
        &self,
        firm: &FirmId,
        reports: &'a [AccountingRecord],
        issues: &mut Vec<JoinIssue>,
    ) -> Vec<Vintage<'a>> {
        let mut dated: Vec<(Period, &'a AccountingRecord)> = Vec::with_capacity(reports.len());
        for report in reports {
            match self.config.availability.effective_period(report.report_date) {
                Some(effective) => dated.push((effective, report)),
                None => debug!(firm = %firm, date = %report.report_date, "report outside calendar"),
            }
        }
        dated.sort_by(|a, b| (a.0, a.1.report_date).cmp(&(b.0, b.1.report_date)));

        let mut timeline = Vec::new();
        for group in dated.chunk_by(|a, b| a.0 == b.0) {
            let effective = group[0].0;
            // Latest report date in the period wins
            let latest_date = group[group.len() - 1].1.report_date;
            let latest: Vec<&AccountingRecord> =
                group.iter().filter(|(_, r)| r.report_date == latest_date).map(|(_, r)| *r).collect();

            let values = if latest.windows(2).all(|w| w[0].values == w[1].values) {
                Some(latest[0])
            } else {
                warn!(firm = %firm, date = %latest_date, %effective, "ambiguous accounting vintage");
                issues.push(JoinIssue::AmbiguousVintage {
                    firm: firm.clone(),
                    report_date: latest_date,
                    effective,
                });
                None
            };
            timeline.push(Vintage { effective, values });
        }
        timeline
    }

    /// The vintage in force in `period`, if any and not stale.
    fn vintage_at<'a>(&self, timeline: &[Vintage<'a>], period: Period) -> Option<&'a AccountingRecord> {
        let idx = timeline.partition_point(|v| v.effective <= period).checked_sub(1)?;
        let vintage = &timeline[idx];
        if let Some(limit) = self.config.max_staleness_months {
            if period.months_since(&vintage.effective) > i32::try_from(limit).unwrap_or(i32::MAX) {
                return None;
            }
        }
        vintage.values
    }
}

impl JoinOutput {
    /// Entities of rows that have no resolvable firm.
    #[must_use]
    pub fn unmatched_entities(&self) -> BTreeSet<EntityId> {
        self.panel.observations().iter().filter(|o| o.firm.is_none()).map(|o| o.entity).collect()
    }
}

#[cfg(test)]
mod tests {
    use portsort_primitives::LinkRecord;
    use rstest::rstest;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(y: i32, m: u32) -> Period {
        Period::new(y, m).unwrap()
    }

    fn monthly_panel(entity: i64, firm: &str, from: Period, months: i32) -> Vec<Observation> {
        (0..months)
            .map(|i| Observation::new(EntityId::new(entity), from.offset(i).unwrap()).with_firm(firm))
            .collect()
    }

    fn be(panel: &Panel, entity: i64, p: Period) -> Option<f64> {
        panel.get(EntityId::new(entity), p).and_then(|o| o.characteristic("be"))
    }

    #[rstest]
    #[case(AvailabilityRule::Months(6), date(2020, 12, 31), period(2021, 7))]
    #[case(AvailabilityRule::Months(6), date(2020, 6, 1), period(2020, 12))]
    #[case(AvailabilityRule::Months(0), date(2020, 3, 15), period(2020, 4))]
    #[case(
        AvailabilityRule::FiscalYearEnd { rebalance_month: 6, min_lag_months: 4 },
        date(2020, 12, 31),
        period(2021, 6)
    )]
    #[case(
        AvailabilityRule::FiscalYearEnd { rebalance_month: 6, min_lag_months: 4 },
        date(2020, 3, 31),
        period(2021, 6)
    )]
    #[case(
        AvailabilityRule::FiscalYearEnd { rebalance_month: 6, min_lag_months: 6 },
        date(2020, 12, 31),
        period(2021, 7)
    )]
    fn effective_periods(#[case] rule: AvailabilityRule, #[case] report: Date, #[case] expected: Period) {
        assert_eq!(rule.effective_period(report), Some(expected));
    }

    #[test]
    fn invalid_rebalance_month_rejected() {
        let config = JoinConfig {
            availability: AvailabilityRule::FiscalYearEnd { rebalance_month: 13, min_lag_months: 0 },
            max_staleness_months: None,
        };
        assert!(matches!(TemporalJoin::new(config), Err(PanelError::InvalidConfig(_))));
    }

    #[test]
    fn lag_invariant_holds() {
        let panel = Panel::new(monthly_panel(1, "F", period(2020, 1), 24)).unwrap();
        let report = date(2020, 3, 31);
        let accounting =
            AccountingTable::new(vec![AccountingRecord::new("F", report).with_value("be", 5.0)]);
        let engine = TemporalJoin::new(JoinConfig::default()).unwrap();

        let out = engine.join(&panel, &accounting, None);
        let available = report.checked_add_months(Months::new(6)).unwrap();

        for obs in out.panel.observations() {
            if obs.period.first_day() < available {
                assert_eq!(obs.characteristic("be"), None, "leaked into {}", obs.period);
            } else {
                assert_eq!(obs.characteristic("be"), Some(5.0));
            }
        }
    }

    #[test]
    fn values_carry_forward_until_superseded() {
        let panel = Panel::new(monthly_panel(1, "F", period(2021, 1), 24)).unwrap();
        let accounting = AccountingTable::new(vec![
            AccountingRecord::new("F", date(2020, 12, 31)).with_value("be", 1.0),
            AccountingRecord::new("F", date(2021, 12, 31)).with_value("be", 2.0),
        ]);
        let engine = TemporalJoin::default();
        let out = engine.join(&panel, &accounting, None);

        assert_eq!(be(&out.panel, 1, period(2021, 6)), None);
        assert_eq!(be(&out.panel, 1, period(2021, 7)), Some(1.0));
        assert_eq!(be(&out.panel, 1, period(2022, 6)), Some(1.0));
        assert_eq!(be(&out.panel, 1, period(2022, 7)), Some(2.0));
        assert!(out.issues.is_empty());
    }

    #[test]
    fn latest_report_in_same_effective_period_wins() {
        let panel = Panel::new(monthly_panel(1, "F", period(2021, 7), 1)).unwrap();
        let accounting = AccountingTable::new(vec![
            AccountingRecord::new("F", date(2020, 12, 31)).with_value("be", 2.0),
            AccountingRecord::new("F", date(2020, 12, 5)).with_value("be", 1.0),
        ]);
        let out = TemporalJoin::default().join(&panel, &accounting, None);
        assert_eq!(be(&out.panel, 1, period(2021, 7)), Some(2.0));
    }

    #[test]
    fn conflicting_same_date_reports_are_ambiguous() {
        let panel = Panel::new(monthly_panel(1, "F", period(2021, 1), 24)).unwrap();
        let accounting = AccountingTable::new(vec![
            AccountingRecord::new("F", date(2019, 12, 31)).with_value("be", 0.5),
            AccountingRecord::new("F", date(2020, 12, 31)).with_value("be", 1.0),
            AccountingRecord::new("F", date(2020, 12, 31)).with_value("be", 1.5),
            AccountingRecord::new("F", date(2021, 12, 31)).with_value("be", 3.0),
        ]);
        let out = TemporalJoin::default().join(&panel, &accounting, None);

        assert_eq!(out.issues.len(), 1);
        assert!(matches!(&out.issues[0], JoinIssue::AmbiguousVintage { effective, .. } if *effective == period(2021, 7)));
        assert_eq!(be(&out.panel, 1, period(2021, 6)), Some(0.5));
        assert_eq!(be(&out.panel, 1, period(2021, 7)), None);
        assert_eq!(be(&out.panel, 1, period(2022, 7)), Some(3.0));
    }

    #[test]
    fn identical_duplicates_collapse() {
        let panel = Panel::new(monthly_panel(1, "F", period(2021, 7), 1)).unwrap();
        let record = AccountingRecord::new("F", date(2020, 12, 31)).with_value("be", 1.0);
        let accounting = AccountingTable::new(vec![record.clone(), record]);
        let out = TemporalJoin::default().join(&panel, &accounting, None);

        assert!(out.issues.is_empty());
        assert_eq!(be(&out.panel, 1, period(2021, 7)), Some(1.0));
    }

    #[test]
    fn staleness_limit_expires_values() {
        let panel = Panel::new(monthly_panel(1, "F", period(2021, 7), 30)).unwrap();
        let accounting = AccountingTable::new(vec![
            AccountingRecord::new("F", date(2020, 12, 31)).with_value("be", 1.0),
        ]);
        let engine = TemporalJoin::new(JoinConfig {
            availability: AvailabilityRule::Months(6),
            max_staleness_months: Some(12),
        })
        .unwrap();
        let out = engine.join(&panel, &accounting, None);

        assert_eq!(be(&out.panel, 1, period(2022, 7)), Some(1.0));
        assert_eq!(be(&out.panel, 1, period(2022, 8)), None);
    }

    #[test]
    fn huge_staleness_limit_never_expires() {
        let panel = Panel::new(monthly_panel(1, "F", period(2021, 7), 3)).unwrap();
        let accounting = AccountingTable::new(vec![
            AccountingRecord::new("F", date(2020, 12, 31)).with_value("be", 1.0),
        ]);
        let engine = TemporalJoin::new(JoinConfig {
            availability: AvailabilityRule::Months(6),
            max_staleness_months: Some(u32::MAX),
        })
        .unwrap();
        let out = engine.join(&panel, &accounting, None);

        assert_eq!(be(&out.panel, 1, period(2021, 7)), Some(1.0));
        assert_eq!(be(&out.panel, 1, period(2021, 9)), Some(1.0));
    }

    #[test]
    fn links_resolve_firms_and_siblings_stay_distinct() {
        let rows = (1..=3).map(|e| Observation::new(EntityId::new(e), period(2021, 7))).collect();
        let panel = Panel::new(rows).unwrap();
        let links = LinkTable::new(vec![
            LinkRecord::new(EntityId::new(1), "F", date(2000, 1, 1), None),
            LinkRecord::new(EntityId::new(2), "F", date(2000, 1, 1), None),
        ]);
        let accounting = AccountingTable::new(vec![
            AccountingRecord::new("F", date(2020, 12, 31)).with_value("be", 1.0),
        ]);
        let out = TemporalJoin::default().join(&panel, &accounting, Some(&links));

        assert_eq!(out.panel.len(), 3);
        assert_eq!(be(&out.panel, 1, period(2021, 7)), Some(1.0));
        assert_eq!(be(&out.panel, 2, period(2021, 7)), Some(1.0));
        assert_eq!(be(&out.panel, 3, period(2021, 7)), None);
        assert_eq!(out.unmatched, 1);
        assert_eq!(out.unmatched_entities().into_iter().collect::<Vec<_>>(), vec![EntityId::new(3)]);
    }

    #[test]
    fn join_is_idempotent() {
        let panel = Panel::new(monthly_panel(1, "F", period(2020, 1), 36)).unwrap();
        let accounting = AccountingTable::new(vec![
            AccountingRecord::new("F", date(2019, 12, 31)).with_value("be", 1.0).with_value("op", 0.2),
            AccountingRecord::new("F", date(2020, 12, 31)).with_value("be", 2.0),
        ]);
        let engine = TemporalJoin::default();

        let once = engine.join(&panel, &accounting, None).panel;
        let twice = engine.join(&once, &accounting, None).panel;
        assert_eq!(once, twice);
        // Fields missing from the newer vintage are undefined, not carried over
        assert_eq!(once.get(EntityId::new(1), period(2021, 7)).unwrap().characteristic("op"), None);
    }
}
