use crate::utils::MonthKey;
use chrono::{DateTime, Datelike, NaiveDate};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Day-first dates as exported by the studio's booking system, optionally
/// followed by a time component (`15/02/2024 18:30:00`).
static DAY_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})(?:[\sT,]+\S.*)?$").expect("valid day-first pattern")
});

/// Formats tried, in order, when the day-first pattern does not apply.
/// Any trailing time component after a space or `T` is ignored.
const FALLBACK_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%m/%d/%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%a %b %d %Y",
];

/// Normalized calendar date of a record.
///
/// Parsing is total: anything unparseable becomes `Invalid`, which callers
/// exclude from month buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalDate {
    Valid(NaiveDate),
    Invalid,
}

impl CanonicalDate {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            CanonicalDate::Valid(date) => Some(*date),
            CanonicalDate::Invalid => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, CanonicalDate::Valid(_))
    }

    /// `(year, month, day)` with 1-based month and day.
    pub fn ymd(&self) -> Option<(i32, u32, u32)> {
        self.date().map(|d| (d.year(), d.month(), d.day()))
    }

    pub fn month_key(&self) -> Option<MonthKey> {
        self.date().map(MonthKey::from_date)
    }
}

pub fn normalize(date_str: &str) -> CanonicalDate {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return CanonicalDate::Invalid;
    }

    if let Some(date) = parse_day_first(trimmed) {
        return CanonicalDate::Valid(date);
    }

    match parse_fallback(trimmed) {
        Some(date) => CanonicalDate::Valid(date),
        None => {
            debug!("Unparseable date '{}', excluding from month buckets", date_str);
            CanonicalDate::Invalid
        }
    }
}

fn parse_day_first(value: &str) -> Option<NaiveDate> {
    let caps = DAY_FIRST.captures(value)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_fallback(value: &str) -> Option<NaiveDate> {
    let rfc3339 = DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.date_naive());

    rfc3339
        .into_iter()
        .chain(
            FALLBACK_FORMATS
                .iter()
                .filter_map(|fmt| parse_with_trailing_time(value, fmt)),
        )
        .chain(parse_month_only(value))
        .find(|date| is_plausible(*date))
}

/// Loose formats happily accept two-digit or far-future years.
fn is_plausible(date: NaiveDate) -> bool {
    date.year() > 1900 && date.year() < 2100
}

/// Month-level stamps such as payroll's `Jan-2024` or `2024-03` land on the
/// first day.
fn parse_month_only(value: &str) -> Option<NaiveDate> {
    let named = format!("01 {}", value.replace('-', " "));
    NaiveDate::parse_from_str(&named, "%d %b %Y")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d"))
        .ok()
}

fn parse_with_trailing_time(value: &str, fmt: &str) -> Option<NaiveDate> {
    let (date, remainder) = NaiveDate::parse_and_remainder(value, fmt).ok()?;
    let remainder_is_time = remainder.is_empty()
        || remainder.starts_with(char::is_whitespace)
        || remainder.starts_with('T');

    remainder_is_time.then_some(date)
}
