//! Period-by-period portfolio sorts over a panel.

use std::collections::BTreeSet;

use polars::prelude::*;
use portsort_panel::{Panel, date_column};
use portsort_primitives::{
    Bucket, EntityId, Observation, Period, PortfolioAssignment, PortfolioKey,
};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{SortConfig, SortError, SortMode, SortVariable, assign_bucket, compute_breakpoints};

/// Cutpoints used in one period.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointRecord {
    /// Month.
    pub period: Period,
    /// Sorting variable.
    pub variable: String,
    /// Primary bucket the cutpoints were computed in, for dependent sorts.
    pub conditioning: Option<Bucket>,
    /// Non-decreasing cutpoints.
    pub cutpoints: Vec<f64>,
}

/// An entity left out of a period's sort because a sorting value is invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct Exclusion {
    /// Entity.
    pub entity: EntityId,
    /// Month.
    pub period: Period,
    /// Variable with the invalid value.
    pub variable: String,
    /// The rejected value; `None` when undefined.
    pub value: Option<f64>,
}

/// A period, or a primary bucket of it, without breakpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSort {
    /// Month.
    pub period: Period,
    /// Variable lacking reference values.
    pub variable: String,
    /// Primary bucket, when a dependent sort lost a single bucket.
    pub conditioning: Option<Bucket>,
}

/// Everything produced by a sort.
#[derive(Debug, Clone, Default)]
pub struct SortOutput {
    /// Assignments ordered by period, then entity.
    pub assignments: Vec<PortfolioAssignment>,
    /// Breakpoints ordered by period.
    pub breakpoints: Vec<BreakpointRecord>,
    /// Entities excluded for invalid sorting values.
    pub exclusions: Vec<Exclusion>,
    /// Periods or buckets skipped for lack of reference data.
    pub skipped: Vec<SkippedSort>,
}

impl SortOutput {
    fn extend(&mut self, other: Self) {
        self.assignments.extend(other.assignments);
        self.breakpoints.extend(other.breakpoints);
        self.exclusions.extend(other.exclusions);
        self.skipped.extend(other.skipped);
    }

    /// Distinct portfolio keys, ascending.
    #[must_use]
    pub fn keys(&self) -> BTreeSet<PortfolioKey> {
        self.assignments.iter().map(|a| a.key).collect()
    }

    /// Assignments as a frame with `permno, month, primary, secondary` columns.
    ///
    /// # Errors
    /// Returns error if frame construction fails.
    pub fn assignments_frame(&self) -> Result<DataFrame, SortError> {
        let rows = &self.assignments;
        let month = date_column("month", rows.iter().map(|a| a.period.first_day()))?;
        let df = DataFrame::new(vec![
            Column::new("permno".into(), rows.iter().map(|a| a.entity.0).collect::<Vec<_>>()),
            month,
            Column::new("primary".into(), rows.iter().map(|a| u32::from(a.key.primary.get())).collect::<Vec<_>>()),
            Column::new(
                "secondary".into(),
                rows.iter().map(|a| a.key.secondary.map(|b| u32::from(b.get()))).collect::<Vec<_>>(),
            ),
        ])?;
        Ok(df)
    }
}

/// One row's validated sorting values.
struct Candidate<'a> {
    obs: &'a Observation,
    primary: f64,
    secondary: Option<f64>,
    reference: bool,
}

/// Sorts each period of a panel into portfolios.
#[derive(Debug, Clone)]
pub struct PortfolioSorter {
    config: SortConfig,
}

impl PortfolioSorter {
    /// Create a sorter.
    ///
    /// # Errors
    /// Returns `SortError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: SortConfig) -> Result<Self, SortError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Sort every period of `panel`.
    ///
    /// Periods are processed in parallel; the output is ordered by period.
    #[must_use]
    pub fn sort(&self, panel: &Panel) -> SortOutput {
        let periods: Vec<(Period, Vec<&Observation>)> = panel.by_period().into_iter().collect();

        let per_period: Vec<SortOutput> =
            periods.par_iter().map(|(period, rows)| self.sort_period(*period, rows)).collect();

        let mut output = SortOutput::default();
        for part in per_period {
            output.extend(part);
        }

        info!(
            periods = periods.len(),
            assignments = output.assignments.len(),
            exclusions = output.exclusions.len(),
            skipped = output.skipped.len(),
            "portfolio sort complete"
        );
        output
    }

    /// Sort the cross-section of a single period.
    ///
    /// `rows` must all belong to `period`; entities keep the given order.
    #[must_use]
    pub fn sort_period(&self, period: Period, rows: &[&Observation]) -> SortOutput {
        let mut output = SortOutput::default();
        let candidates = self.candidates(period, rows, &mut output.exclusions);

        let primary = &self.config.primary;
        let reference: Vec<f64> =
            candidates.iter().filter(|c| c.reference).map(|c| c.primary).collect();
        let Some(primary_cuts) = breakpoints_or_skip(period, primary, None, &reference, &mut output)
        else {
            return output;
        };

        let primary_buckets: Vec<Bucket> =
            candidates.iter().map(|c| assign_bucket(c.primary, &primary_cuts)).collect();

        let Some(secondary) = &self.config.secondary else {
            output.assignments = candidates
                .iter()
                .zip(&primary_buckets)
                .map(|(c, b)| assignment(c.obs, PortfolioKey::single(*b)))
                .collect();
            debug!(%period, assigned = output.assignments.len(), "univariate sort");
            return output;
        };

        let reference_pairs: Vec<(Bucket, f64)> = candidates
            .iter()
            .zip(&primary_buckets)
            .filter(|(c, _)| c.reference)
            .filter_map(|(c, b)| c.secondary.map(|v| (*b, v)))
            .collect();

        let secondary_cuts: Vec<Option<Vec<f64>>> = match self.config.mode {
            SortMode::Independent => {
                let values: Vec<f64> = reference_pairs.iter().map(|(_, v)| *v).collect();
                let cuts = breakpoints_or_skip(period, secondary, None, &values, &mut output);
                vec![cuts; primary.breakpoints.num_buckets()]
            }
            SortMode::Dependent => {
                let occupied: BTreeSet<Bucket> = primary_buckets.iter().copied().collect();
                (1..=primary.breakpoints.num_buckets())
                    .map(|index| {
                        let bucket = Bucket::from_index(u16::try_from(index - 1).unwrap_or(u16::MAX));
                        // Buckets nobody falls into need no cutpoints
                        if !occupied.contains(&bucket) {
                            return None;
                        }
                        let values: Vec<f64> =
                            reference_pairs.iter().filter(|(b, _)| *b == bucket).map(|(_, v)| *v).collect();
                        breakpoints_or_skip(period, secondary, Some(bucket), &values, &mut output)
                    })
                    .collect()
            }
        };

        for (candidate, primary_bucket) in candidates.iter().zip(&primary_buckets) {
            let cuts = secondary_cuts.get(usize::from(primary_bucket.get()) - 1).and_then(Option::as_ref);
            if let (Some(cuts), Some(value)) = (cuts, candidate.secondary) {
                let key = PortfolioKey::pair(*primary_bucket, assign_bucket(value, cuts));
                output.assignments.push(assignment(candidate.obs, key));
            }
        }

        debug!(%period, assigned = output.assignments.len(), mode = ?self.config.mode, "bivariate sort");
        output
    }

    /// Rows with valid values for every sorting variable; the rest are excluded.
    fn candidates<'a>(
        &self,
        period: Period,
        rows: &[&'a Observation],
        exclusions: &mut Vec<Exclusion>,
    ) -> Vec<Candidate<'a>> {
        let mut candidates = Vec::with_capacity(rows.len());
        for &obs in rows {
            let mut valid = true;
            let mut values = [None, None];
            for (slot, variable) in values.iter_mut().zip(self.config.variables()) {
                let value = obs.characteristic(&variable.name);
                match value {
                    Some(v) if variable.accepts(v) => *slot = Some(v),
                    _ => {
                        valid = false;
                        exclusions.push(Exclusion {
                            entity: obs.entity,
                            period,
                            variable: variable.name.clone(),
                            value,
                        });
                    }
                }
            }
            if let (true, Some(primary)) = (valid, values[0]) {
                candidates.push(Candidate {
                    obs,
                    primary,
                    secondary: values[1],
                    reference: self.config.reference_exchanges.is_empty()
                        || obs.listed_on(&self.config.reference_exchanges),
                });
            }
        }
        candidates
    }
}

fn assignment(obs: &Observation, key: PortfolioKey) -> PortfolioAssignment {
    PortfolioAssignment { entity: obs.entity, period: obs.period, key }
}

/// Compute cutpoints, recording them or the skip in `output`.
fn breakpoints_or_skip(
    period: Period,
    variable: &SortVariable,
    conditioning: Option<Bucket>,
    values: &[f64],
    output: &mut SortOutput,
) -> Option<Vec<f64>> {
    match compute_breakpoints(&variable.name, values, &variable.breakpoints) {
        Ok(cutpoints) => {
            output.breakpoints.push(BreakpointRecord {
                period,
                variable: variable.name.clone(),
                conditioning,
                cutpoints: cutpoints.clone(),
            });
            Some(cutpoints)
        }
        Err(err) => {
            warn!(%period, variable = %variable.name, ?conditioning, error = %err, "breakpoints skipped");
            output.skipped.push(SkippedSort {
                period,
                variable: variable.name.clone(),
                conditioning,
            });
            None
        }
    }
}
