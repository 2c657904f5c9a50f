//! Portfolio return aggregation.

use std::collections::BTreeMap;

use polars::prelude::*;
use portsort_panel::{Panel, date_column};
use portsort_primitives::{Period, PortfolioAssignment, PortfolioKey, PortfolioReturn};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ModelError;

/// How constituents are weighted within a portfolio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// Weight by the row's lagged market value.
    #[default]
    Value,
    /// Every constituent counts once.
    Equal,
}

/// Aggregates member returns into portfolio returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnAggregator {
    weighting: Weighting,
}

#[derive(Default)]
struct Accumulator {
    weighted: f64,
    total_weight: f64,
    constituents: usize,
}

impl ReturnAggregator {
    /// Create an aggregator.
    #[must_use]
    pub const fn new(weighting: Weighting) -> Self {
        Self { weighting }
    }

    /// Get the weighting scheme.
    #[must_use]
    pub const fn weighting(&self) -> Weighting {
        self.weighting
    }

    /// Weighted return of every portfolio in every period.
    ///
    /// Each assignment is matched to the panel row of the same entity and
    /// period. A member contributes when its return is defined and, under
    /// value weighting, its weight is defined and positive. Portfolios with no
    /// contributing member produce no row. Output is ordered by period, then key.
    #[must_use]
    pub fn aggregate(&self, panel: &Panel, assignments: &[PortfolioAssignment]) -> Vec<PortfolioReturn> {
        let mut groups: BTreeMap<(Period, PortfolioKey), Accumulator> = BTreeMap::new();
        let mut dropped = 0_usize;

        for assignment in assignments {
            let Some(obs) = panel.get(assignment.entity, assignment.period) else {
                dropped += 1;
                continue;
            };
            let weight = match self.weighting {
                Weighting::Value => obs.weight.filter(|w| *w > 0.0),
                Weighting::Equal => Some(1.0),
            };
            let (Some(ret), Some(weight)) = (obs.ret, weight) else {
                dropped += 1;
                continue;
            };

            let acc = groups.entry((assignment.period, assignment.key)).or_default();
            acc.weighted += weight * ret;
            acc.total_weight += weight;
            acc.constituents += 1;
        }

        debug!(portfolios = groups.len(), dropped, weighting = ?self.weighting, "aggregated portfolio returns");

        groups
            .into_iter()
            .map(|((period, key), acc)| PortfolioReturn {
                period,
                key,
                ret: acc.weighted / acc.total_weight,
                total_weight: acc.total_weight,
                constituents: acc.constituents,
            })
            .collect()
    }
}

/// Portfolio returns as a frame with columns
/// `month, portfolio, primary, secondary, ret, total_weight, constituents`.
///
/// # Errors
/// Returns error if frame construction fails.
pub fn portfolio_returns_frame(returns: &[PortfolioReturn]) -> Result<DataFrame, ModelError> {
    Ok(DataFrame::new(vec![
        date_column("month", returns.iter().map(|r| r.period.first_day()))?,
        Column::new("portfolio".into(), returns.iter().map(|r| r.key.to_string()).collect::<Vec<_>>()),
        Column::new(
            "primary".into(),
            returns.iter().map(|r| u32::from(r.key.primary.get())).collect::<Vec<_>>(),
        ),
        Column::new(
            "secondary".into(),
            returns.iter().map(|r| r.key.secondary.map(|b| u32::from(b.get()))).collect::<Vec<_>>(),
        ),
        Column::new("ret".into(), returns.iter().map(|r| r.ret).collect::<Vec<_>>()),
        Column::new("total_weight".into(), returns.iter().map(|r| r.total_weight).collect::<Vec<_>>()),
        Column::new(
            "constituents".into(),
            returns.iter().map(|r| r.constituents as u64).collect::<Vec<_>>(),
        ),
    ])?)
}
