//! Monthly period type.

use std::fmt;

use chrono::{Datelike, Months};
use serde::{Deserialize, Serialize};

use crate::Date;

/// A calendar month, stored as its first day.
///
/// Every constructor normalizes to day one, so two periods compare equal
/// exactly when they name the same month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Date", into = "Date")]
pub struct Period(Date);

impl Period {
    /// Create a period from a year and a month (1-12).
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        Date::from_ymd_opt(year, month, 1).map(Self)
    }

    /// The month containing `date`.
    #[must_use]
    pub fn containing(date: Date) -> Self {
        Self(date.with_day(1).unwrap_or(date))
    }

    /// The first month that starts on or after `date`.
    ///
    /// A date on the first of a month maps to that month; any later day maps
    /// to the following month.
    #[must_use]
    pub fn starting_on_or_after(date: Date) -> Option<Self> {
        let month = Self::containing(date);
        if date.day() == 1 { Some(month) } else { month.succ() }
    }

    /// First day of the month.
    #[must_use]
    pub const fn first_day(&self) -> Date {
        self.0
    }

    /// Last day of the month.
    #[must_use]
    pub fn last_day(&self) -> Date {
        self.succ().and_then(|next| next.0.pred_opt()).unwrap_or(self.0)
    }

    /// Calendar year.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Calendar month (1-12).
    #[must_use]
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Shift by a signed number of months.
    #[must_use]
    pub fn offset(&self, months: i32) -> Option<Self> {
        let shifted = if months >= 0 {
            self.0.checked_add_months(Months::new(months.unsigned_abs()))
        } else {
            self.0.checked_sub_months(Months::new(months.unsigned_abs()))
        };
        shifted.map(Self)
    }

    /// The following month.
    #[must_use]
    pub fn succ(&self) -> Option<Self> {
        self.offset(1)
    }

    /// The preceding month.
    #[must_use]
    pub fn pred(&self) -> Option<Self> {
        self.offset(-1)
    }

    /// Whole months from `earlier` to `self` (negative if `earlier` is later).
    #[must_use]
    pub fn months_since(&self, earlier: &Self) -> i32 {
        (self.year() - earlier.year()) * 12 + self.month() as i32 - earlier.month() as i32
    }
}

impl From<Period> for Date {
    fn from(period: Period) -> Self {
        period.0
    }
}

impl TryFrom<Date> for Period {
    type Error = String;

    fn try_from(date: Date) -> Result<Self, Self::Error> {
        if date.day() == 1 {
            Ok(Self(date))
        } else {
            Err(format!("period must start on the first day of a month, got {date}"))
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}
