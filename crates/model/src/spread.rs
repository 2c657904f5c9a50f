//! Long-short spreads and time-series summaries.
//!
//! A spread such as SMB averages the portfolios along the axis that is held
//! constant (book-to-market for SMB) and takes the long leg minus the short
//! leg along the target axis (size).

use std::collections::BTreeMap;

use polars::prelude::*;
use portsort_math::{correlation, mean, t_statistic};
use portsort_panel::date_column;
use portsort_primitives::{Bucket, Period, PortfolioKey, PortfolioReturn};
use portsort_traits::StandardErrorEstimator;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ModelError, NaiveStandardError, NeweyWest};

/// Sorting dimension a spread is taken along.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadAxis {
    /// First sorting variable.
    #[default]
    Primary,
    /// Second sorting variable.
    Secondary,
}

impl SpreadAxis {
    fn bucket(self, key: &PortfolioKey) -> Option<Bucket> {
        match self {
            Self::Primary => Some(key.primary),
            Self::Secondary => key.secondary,
        }
    }
}

/// Definition of a long-short spread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadSpec {
    /// Name of the spread, e.g. `"SMB"`.
    pub name: String,
    /// Axis along which the legs are chosen.
    pub axis: SpreadAxis,
    /// Bucket held long.
    pub long: Bucket,
    /// Bucket held short.
    pub short: Bucket,
}

impl SpreadSpec {
    /// Create a spread definition.
    #[must_use]
    pub fn new(name: impl Into<String>, axis: SpreadAxis, long: Bucket, short: Bucket) -> Self {
        Self { name: name.into(), axis, long, short }
    }

    /// Spread return per period.
    ///
    /// Each leg is the equal-weighted average of the portfolios in that bucket
    /// that have a return in the period. Periods lacking either leg are
    /// skipped.
    #[must_use]
    pub fn returns(&self, portfolios: &[PortfolioReturn]) -> Vec<SpreadReturn> {
        let mut legs: BTreeMap<Period, [(f64, usize); 2]> = BTreeMap::new();
        for portfolio in portfolios {
            let Some(bucket) = self.axis.bucket(&portfolio.key) else { continue };
            let side = if bucket == self.long {
                0
            } else if bucket == self.short {
                1
            } else {
                continue;
            };
            let leg = &mut legs.entry(portfolio.period).or_default()[side];
            leg.0 += portfolio.ret;
            leg.1 += 1;
        }

        let total = legs.len();
        let spreads: Vec<SpreadReturn> = legs
            .into_iter()
            .filter(|(_, [long, short])| long.1 > 0 && short.1 > 0)
            .map(|(period, [long, short])| SpreadReturn {
                period,
                ret: long.0 / long.1 as f64 - short.0 / short.1 as f64,
            })
            .collect();

        debug!(spread = %self.name, periods = spreads.len(), skipped = total - spreads.len(), "spread returns");
        spreads
    }
}

/// One period of a spread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadReturn {
    /// Month.
    pub period: Period,
    /// Long minus short return.
    pub ret: f64,
}

/// Spread returns as a frame with `month, ret` columns.
///
/// # Errors
/// Returns error if frame construction fails.
pub fn spread_returns_frame(spreads: &[SpreadReturn]) -> Result<DataFrame, ModelError> {
    Ok(DataFrame::new(vec![
        date_column("month", spreads.iter().map(|s| s.period.first_day()))?,
        Column::new("ret".into(), spreads.iter().map(|s| s.ret).collect::<Vec<_>>()),
    ])?)
}

/// Mean of a time series with naive and Newey-West inference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    /// Time-series mean.
    pub mean: f64,
    /// Sample standard deviation over `sqrt(T)`.
    pub naive_standard_error: f64,
    /// `mean / naive_standard_error`, undefined for a zero error.
    pub naive_t_statistic: Option<f64>,
    /// Newey-West standard error.
    pub robust_standard_error: f64,
    /// `mean / robust_standard_error`, undefined for a zero error.
    pub robust_t_statistic: Option<f64>,
    /// Number of periods.
    pub periods: usize,
}

impl SeriesSummary {
    /// Summarize `series`.
    ///
    /// # Errors
    /// Returns `ModelError::InsufficientData` with fewer than two periods, or
    /// fewer than three when prewhitening.
    pub fn compute(series: &[f64], robust: &NeweyWest) -> Result<Self, ModelError> {
        let required = if robust.prewhiten { 3 } else { 2 };
        let Some(mean) = mean(series).filter(|_| series.len() >= required) else {
            return Err(ModelError::InsufficientData { required, actual: series.len() });
        };

        let naive_standard_error = NaiveStandardError.standard_error(series)?;
        let robust_standard_error = robust.standard_error(series)?;

        Ok(Self {
            mean,
            naive_standard_error,
            naive_t_statistic: t_statistic(mean, naive_standard_error),
            robust_standard_error,
            robust_t_statistic: t_statistic(mean, robust_standard_error),
            periods: series.len(),
        })
    }
}

/// Agreement between a replicated factor and a reference series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplicationFit {
    /// Pearson correlation over overlapping periods.
    pub correlation: f64,
    /// Squared correlation.
    pub r_squared: f64,
    /// Number of overlapping periods.
    pub periods: usize,
}

/// Compare a replicated spread with a reference series over common periods.
///
/// `None` with fewer than two common periods or a constant series.
#[must_use]
pub fn replication_fit(replicated: &[SpreadReturn], reference: &[SpreadReturn]) -> Option<ReplicationFit> {
    let reference: BTreeMap<Period, f64> = reference.iter().map(|s| (s.period, s.ret)).collect();
    let (x, y): (Vec<f64>, Vec<f64>) = replicated
        .iter()
        .filter_map(|s| reference.get(&s.period).map(|r| (s.ret, *r)))
        .unzip();

    let rho = correlation(&x, &y)?;
    Some(ReplicationFit { correlation: rho, r_squared: rho * rho, periods: x.len() })
}
