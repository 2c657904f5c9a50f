#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/portsort/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod panel;
pub use panel::Panel;

mod accounting;
pub use accounting::AccountingTable;

mod link;
pub use link::LinkTable;

mod join;
pub use join::{AvailabilityRule, JoinConfig, JoinIssue, JoinOutput, TemporalJoin};

mod align;
pub use align::{lag_weights, lead_returns};

mod cycle;
pub use cycle::{RebalanceCycle, SnapshotRule};

mod fill;
pub use fill::{forward_fill, forward_fill_frame};

mod frame;
pub use frame::{AccountingColumns, LinkColumns, PanelColumns, check_key_types, date_column};

mod error;
pub use error::PanelError;
