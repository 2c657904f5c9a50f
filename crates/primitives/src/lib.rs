#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/portsort/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod period;
pub use period::Period;

mod ids;
pub use ids::{EntityId, Exchange, FirmId};

mod observation;
pub use observation::{AccountingRecord, LinkRecord, Observation};

mod portfolio;
pub use portfolio::{Bucket, PortfolioAssignment, PortfolioKey, PortfolioReturn};

mod premium;
pub use premium::RiskPremiumEstimate;

/// Re-export common date type.
pub type Date = chrono::NaiveDate;

/// Map a raw float to a defined value.
///
/// `NaN` and infinities become `None`, so they can never leak into sums.
#[must_use]
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
