use crate::error::{Result, StudioMetricsError};
use crate::schema::MonthOrder;
use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_MONTH_WINDOW: usize = 18;
pub const MAX_MONTH_WINDOW: usize = 120;

/// A calendar month bucket, displayed as `YYYY-MM`.
///
/// `month` is 1-based. Ordering is chronological.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(try_from = "RawMonthKey")]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

#[derive(Deserialize, JsonSchema)]
struct RawMonthKey {
    year: i32,
    month: u32,
}

impl TryFrom<RawMonthKey> for MonthKey {
    type Error = String;

    fn try_from(raw: RawMonthKey) -> std::result::Result<Self, Self::Error> {
        MonthKey::new(raw.year, raw.month)
            .ok_or_else(|| format!("month {} is outside 1..=12", raw.month))
    }
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Shifts the month by `delta` months (negative goes back in time).
    pub fn offset(self, delta: i32) -> Self {
        let index = self.year * 12 + (self.month as i32 - 1) + delta;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn next(self) -> Self {
        self.offset(1)
    }

    pub fn prev(self) -> Self {
        self.offset(-1)
    }

    /// Short display label such as `Jan 2024`.
    pub fn label(&self) -> String {
        match NaiveDate::from_ymd_opt(self.year, self.month, 1) {
            Some(first) => first.format("%b %Y").to_string(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

pub fn validate_month_window(month_window: usize) -> Result<()> {
    if !(1..=MAX_MONTH_WINDOW).contains(&month_window) {
        return Err(StudioMetricsError::InvalidMonthWindow(month_window));
    }
    Ok(())
}

/// Generates `len` consecutive months ending at the month containing `anchor`.
///
/// The sequence is gap-free regardless of whether any records exist for a
/// given month. `order` only controls presentation: both orders contain the
/// same months.
pub fn month_window(anchor: NaiveDate, len: usize, order: MonthOrder) -> Vec<MonthKey> {
    let end = MonthKey::from_date(anchor);
    let mut months: Vec<MonthKey> = (0..len as i32)
        .rev()
        .map(|back| end.offset(-back))
        .collect();

    if order == MonthOrder::NewestFirst {
        months.reverse();
    }

    months
}

/// First and last day of the calendar month before `today`.
///
/// This is the default date range the sales pages open with.
pub fn previous_month_range(today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let end = today.with_day(1)?.pred_opt()?;
    let start = end.with_day(1)?;
    Some((start, end))
}

pub fn months_between(start: MonthKey, end: MonthKey) -> i32 {
    let year_diff = end.year - start.year;
    let month_diff = end.month as i32 - start.month as i32;
    year_diff * 12 + month_diff
}
