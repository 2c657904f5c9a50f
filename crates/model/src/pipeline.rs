//! Join, sort and aggregate in one pass.

use portsort_panel::{AccountingTable, JoinOutput, LinkTable, Panel, TemporalJoin, lag_weights};
use portsort_primitives::PortfolioReturn;
use portsort_sorts::{PortfolioSorter, SortOutput};
use tracing::info;

use crate::{FamaMacBeth, FamaMacBethOutput, ModelError, PipelineConfig, ReturnAggregator};

/// Everything produced by [`Pipeline::portfolios`].
#[derive(Debug, Clone)]
pub struct PortfolioRun {
    /// Joined panel with lagged weights, plus join diagnostics.
    pub join: JoinOutput,
    /// Assignments, breakpoints, exclusions and skipped sorts.
    pub sort: SortOutput,
    /// Portfolio returns ordered by period, then key.
    pub returns: Vec<PortfolioReturn>,
}

/// Stages configured from a single [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    join: TemporalJoin,
    sorter: PortfolioSorter,
    aggregator: ReturnAggregator,
}

impl Pipeline {
    /// Validate `config` and build every stage.
    ///
    /// # Errors
    /// Returns `ModelError::ConfigurationError` if the configuration is invalid.
    pub fn new(config: PipelineConfig) -> Result<Self, ModelError> {
        config.validate()?;
        let join = TemporalJoin::new(config.join_config())?;
        let sorter = PortfolioSorter::new(config.sort_config())?;
        let aggregator = ReturnAggregator::new(config.weighting);
        Ok(Self { config, join, sorter, aggregator })
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Attach accounting data, weight by last month's market value, sort and
    /// aggregate.
    ///
    /// Sorting characteristics are read as they stand on each row, so they
    /// must already be known at the start of the month they sit in.
    #[must_use]
    pub fn portfolios(
        &self,
        panel: &Panel,
        accounting: &AccountingTable,
        links: Option<&LinkTable>,
    ) -> PortfolioRun {
        let mut join = self.join.join(panel, accounting, links);
        join.panel = lag_weights(&join.panel);

        let sort = self.sorter.sort(&join.panel);
        let returns = self.aggregator.aggregate(&join.panel, &sort.assignments);

        info!(
            rows = join.panel.len(),
            assignments = sort.assignments.len(),
            portfolios = sort.keys().len(),
            returns = returns.len(),
            "portfolio run complete"
        );
        PortfolioRun { join, sort, returns }
    }

    /// Fama-MacBeth regressions with the configured settings.
    ///
    /// # Errors
    /// Returns `ModelError::InsufficientData` if too few periods can be estimated.
    pub fn risk_premia(&self, panel: &Panel) -> Result<FamaMacBethOutput, ModelError> {
        FamaMacBeth::new(self.config.fama_macbeth_config())?.run(panel)
    }
}
