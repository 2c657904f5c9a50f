//! Forward filling of characteristics within entities.

use polars::prelude::*;

use crate::Panel;

/// Carry the last defined value of each named characteristic forward within
/// each entity's history.
///
/// Values never cross entities and never move backwards in time. Filling an
/// already filled panel returns it unchanged.
#[must_use]
pub fn forward_fill(panel: &Panel, names: &[&str]) -> Panel {
    panel.map_histories(|_, out| {
        for &name in names {
            let mut last = None;
            for row in out.iter_mut() {
                match row.characteristic(name) {
                    Some(value) => last = Some(value),
                    None => row.set_characteristic(name, last),
                }
            }
        }
    })
}

/// Forward fill feature columns of a `LazyFrame`.
///
/// Casts to float, sorts by `sort_col` and forward fills within each
/// `over_col` partition.
///
/// # Arguments
/// * `df` - Input LazyFrame
/// * `features` - Column names to fill
/// * `sort_col` - Column to sort by (typically "month")
/// * `over_col` - Column to partition by (typically "permno")
pub fn forward_fill_frame(
    df: LazyFrame,
    features: &[&str],
    sort_col: &str,
    over_col: &str,
) -> LazyFrame {
    let sort_options = SortMultipleOptions::new().with_maintain_order(true);
    let mut lf = df.sort([sort_col], sort_options);

    for &feat in features {
        lf = lf.with_column(
            col(feat).cast(DataType::Float64).forward_fill(None).over([col(over_col)]).alias(feat),
        );
    }

    lf
}
