//! # portsort
//!
//! Characteristic-sorted portfolios, long-short factor returns and
//! Fama-MacBeth risk premia for monthly equity panels.
//!
//! This crate re-exports the portsort workspace behind feature flags.
//!
//! ## Features
//!
//! - `full` (default): Enables all components
//! - `primitives`: Periods, identifiers and record types
//! - `traits`: Estimator trait abstractions
//! - `math`: Quantiles, winsorization, OLS and Newey-West
//! - `panel`: Panels, the point-in-time accounting join and alignment helpers
//! - `sorts`: Breakpoints and univariate or bivariate portfolio sorts
//! - `model`: Portfolio returns, spreads and Fama-MacBeth regressions
//!
//! ## Example
//!
//! ```rust,ignore
//! use portsort::model::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::from_json_str(r#"{ "secondary": "bm", "characteristics": ["beta"] }"#)?;
//! let run = Pipeline::new(config)?.portfolios(&panel, &accounting, Some(&links));
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[cfg(feature = "primitives")]
#[doc(inline)]
pub use portsort_primitives as primitives;
#[cfg(feature = "traits")]
#[doc(inline)]
pub use portsort_traits as traits;
#[cfg(feature = "math")]
#[doc(inline)]
pub use portsort_math as math;
#[cfg(feature = "panel")]
#[doc(inline)]
pub use portsort_panel as panel;
#[cfg(feature = "sorts")]
#[doc(inline)]
pub use portsort_sorts as sorts;
#[cfg(feature = "model")]
#[doc(inline)]
pub use portsort_model as model;

