#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/portsort/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod quantile;
pub use quantile::{quantile_sorted, quantiles};

mod winsorize;
pub use winsorize::{Winsorizer, winsorize};

mod linalg;
pub use linalg::{OlsResult, ordinary_least_squares, weighted_least_squares};

mod stats;
pub use stats::{
    bartlett_weight, correlation, mean, naive_standard_error, newey_west_standard_error,
    sample_std, t_statistic, weighted_mean,
};

mod error;
pub use error::MathError;
