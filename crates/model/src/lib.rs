#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/portsort/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod standard_errors;
pub use standard_errors::{DEFAULT_NEWEY_WEST_LAGS, NaiveStandardError, NeweyWest};

mod cross_section;
pub use cross_section::{CrossSectionConfig, OlsCrossSection};

mod returns;
pub use returns::{ReturnAggregator, Weighting, portfolio_returns_frame};

mod spread;
pub use spread::{
    ReplicationFit, SeriesSummary, SpreadAxis, SpreadReturn, SpreadSpec, replication_fit,
    spread_returns_frame,
};

mod fama_macbeth;
pub use fama_macbeth::{
    FamaMacBeth, FamaMacBethConfig, FamaMacBethOutput, INTERCEPT, OmissionReason, PeriodOutcome,
    RiskPremiumSummary,
};

mod config;
pub use config::PipelineConfig;

mod pipeline;
pub use pipeline::{Pipeline, PortfolioRun};

mod error;
pub use error::ModelError;

/// Re-export commonly used types.
pub mod prelude {
    pub use portsort_traits::{CrossSectionEstimator, PanelEstimator, StandardErrorEstimator};

    pub use super::{
        FamaMacBeth, FamaMacBethConfig, ModelError, NeweyWest, Pipeline, PipelineConfig,
        ReturnAggregator, SeriesSummary, SpreadAxis, SpreadSpec, Weighting,
    };
}
