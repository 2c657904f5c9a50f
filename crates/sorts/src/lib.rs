#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/portsort/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod breakpoints;
pub use breakpoints::{BreakpointSpec, assign_bucket, compute_breakpoints};

mod config;
pub use config::{SortConfig, SortMode, SortVariable};

mod sorter;
pub use sorter::{BreakpointRecord, Exclusion, PortfolioSorter, SkippedSort, SortOutput};

mod error;
pub use error::SortError;
