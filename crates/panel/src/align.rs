//! Month-over-month alignment of weights and returns.
//!
//! Both helpers only look at the adjacent calendar month of the same entity;
//! a gap in an entity's history leaves the aligned value undefined rather than
//! borrowing from an older or newer row.

use portsort_primitives::Observation;

use crate::Panel;

/// Set each row's weight to the entity's market cap in the previous month.
///
/// The weight is undefined when the previous month is missing from the
/// panel or its market cap is undefined or not positive.
#[must_use]
pub fn lag_weights(panel: &Panel) -> Panel {
    panel.map_histories(|history, out| {
        for (i, row) in out.iter_mut().enumerate() {
            row.weight = i
                .checked_sub(1)
                .map(|j| &history[j])
                .filter(|prev| prev.period.succ() == Some(row.period))
                .and_then(|prev| prev.market_cap)
                .filter(|cap| *cap > 0.0);
        }
    })
}

/// Store each entity's return of the following month as characteristic `name`.
///
/// Undefined when the following month is missing or its return is undefined.
#[must_use]
pub fn lead_returns(panel: &Panel, name: &str) -> Panel {
    panel.map_histories(|history, out| {
        for (i, row) in out.iter_mut().enumerate() {
            let lead = history
                .get(i + 1)
                .filter(|next: &&Observation| row.period.succ() == Some(next.period))
                .and_then(|next| next.ret);
            row.set_characteristic(name, lead);
        }
    })
}
