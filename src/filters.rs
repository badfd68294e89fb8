use crate::dates::normalize;
use crate::error::{Result, StudioMetricsError};
use crate::schema::{BusinessRecord, GroupField, RecordKind};
use crate::utils::previous_month_range;
use chrono::NaiveDate;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// The calendar month before `today`, which is where the sales views open.
    pub fn previous_month(today: NaiveDate) -> Self {
        match previous_month_range(today) {
            Some((start, end)) => Self::new(Some(start), Some(end)),
            None => Self::default(),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Both bounds are inclusive.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

pub const SESSION_EXCLUDED_KEYWORDS: [&str; 3] = ["Hosted", "P57", "X"];
pub const MIN_SESSION_CHECK_INS: f64 = 2.0;

/// Pre-filter applied to records before they reach the aggregation engine.
///
/// Categorical filters match when any of the given values is a
/// case-insensitive substring of the record's field. Empty lists match
/// everything. The class rules only ever drop session records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
pub struct RecordFilter {
    #[serde(default)]
    pub date_range: DateRange,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub sold_by: Vec<String>,
    #[serde(default)]
    pub payment_methods: Vec<String>,
    #[serde(default)]
    pub min_amount: Option<f64>,
    #[serde(default)]
    pub max_amount: Option<f64>,

    #[serde(default)]
    #[schemars(
        description = "Sessions whose class name contains any of these words (case-insensitive) are dropped"
    )]
    pub exclude_class_keywords: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Sessions with fewer check-ins than this are dropped")]
    pub min_checked_in: Option<f64>,
}

impl RecordFilter {
    /// Attendance views leave out hosted and special-format classes and
    /// near-empty sessions.
    pub fn attendance() -> Self {
        Self {
            exclude_class_keywords: SESSION_EXCLUDED_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            min_checked_in: Some(MIN_SESSION_CHECK_INS),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.date_range.start, self.date_range.end) {
            if start > end {
                return Err(StudioMetricsError::InvalidDateRange {
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }
        }

        if let (Some(min), Some(max)) = (self.min_amount, self.max_amount) {
            if min > max {
                return Err(StudioMetricsError::InvalidAmountRange { min, max });
            }
        }

        Ok(())
    }

    pub fn matches(&self, record: &BusinessRecord) -> bool {
        if !self.date_range.is_unbounded() {
            // A record without a usable date cannot be placed inside any range.
            match normalize(&record.occurred_at).date() {
                Some(date) if self.date_range.contains(date) => {}
                _ => return false,
            }
        }

        let categorical = [
            (GroupField::Location, &self.locations),
            (GroupField::Category, &self.categories),
            (GroupField::SoldBy, &self.sold_by),
            (GroupField::PaymentMethod, &self.payment_methods),
        ];
        if !categorical
            .iter()
            .all(|(field, wanted)| matches_any(record.field(*field), wanted))
        {
            return false;
        }

        if record.kind == RecordKind::Session && !self.keeps_session(record) {
            return false;
        }

        self.min_amount.map_or(true, |min| record.amount >= min)
            && self.max_amount.map_or(true, |max| record.amount <= max)
    }

    fn keeps_session(&self, record: &BusinessRecord) -> bool {
        if self.min_checked_in.is_some_and(|min| record.checked_in < min) {
            return false;
        }

        let class_name = record.field(GroupField::Product).unwrap_or("").to_lowercase();
        let words: Vec<&str> = class_name
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        !self
            .exclude_class_keywords
            .iter()
            .any(|keyword| words.contains(&keyword.to_lowercase().as_str()))
    }

    pub fn apply(&self, records: &[BusinessRecord]) -> Vec<BusinessRecord> {
        let filtered: Vec<BusinessRecord> = records
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();

        debug!(
            "Filter kept {} of {} records",
            filtered.len(),
            records.len()
        );

        filtered
    }
}

fn matches_any(value: Option<&str>, wanted: &[String]) -> bool {
    if wanted.is_empty() {
        return true;
    }
    let Some(value) = value else {
        return false;
    };
    let value = value.to_lowercase();
    wanted
        .iter()
        .any(|w| value.contains(&w.to_lowercase()))
}
