use crate::error::StudioMetricsError;
use crate::schema::BusinessRecord;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    #[schemars(description = "Sum of payment values")]
    Revenue,

    #[schemars(description = "Number of records")]
    Transactions,

    #[schemars(description = "Number of distinct members (entity ids)")]
    Members,

    #[schemars(description = "Units sold. Every record counts as one unit.")]
    Units,

    #[schemars(description = "Average transaction value: revenue / transactions")]
    Atv,

    #[schemars(description = "Average unit value: revenue / units")]
    Auv,

    #[schemars(description = "Average spend per member: revenue / members")]
    Asv,

    #[schemars(description = "Units per transaction: units / transactions")]
    Upt,

    #[schemars(description = "Sum of VAT")]
    Vat,

    #[schemars(description = "Members checked in across sessions")]
    CheckIns,

    #[schemars(description = "Class average: check-ins / sessions")]
    ClassAverage,

    #[schemars(description = "Fill rate in percent: check-ins / capacity * 100")]
    FillRate,
}

/// How the presentation layer should render a metric value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    Currency,
    Count,
    Ratio,
    Percent,
}

impl MetricKind {
    pub const ALL: [MetricKind; 12] = [
        MetricKind::Revenue,
        MetricKind::Transactions,
        MetricKind::Members,
        MetricKind::Units,
        MetricKind::Atv,
        MetricKind::Auv,
        MetricKind::Asv,
        MetricKind::Upt,
        MetricKind::Vat,
        MetricKind::CheckIns,
        MetricKind::ClassAverage,
        MetricKind::FillRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Revenue => "revenue",
            MetricKind::Transactions => "transactions",
            MetricKind::Members => "members",
            MetricKind::Units => "units",
            MetricKind::Atv => "atv",
            MetricKind::Auv => "auv",
            MetricKind::Asv => "asv",
            MetricKind::Upt => "upt",
            MetricKind::Vat => "vat",
            MetricKind::CheckIns => "check_ins",
            MetricKind::ClassAverage => "class_average",
            MetricKind::FillRate => "fill_rate",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::Revenue => "Revenue",
            MetricKind::Transactions => "Transactions",
            MetricKind::Members => "Unique Members",
            MetricKind::Units => "Units Sold",
            MetricKind::Atv => "Avg Transaction Value",
            MetricKind::Auv => "Avg Unit Value",
            MetricKind::Asv => "Avg Spend per Member",
            MetricKind::Upt => "Units per Transaction",
            MetricKind::Vat => "VAT",
            MetricKind::CheckIns => "Check-ins",
            MetricKind::ClassAverage => "Class Average",
            MetricKind::FillRate => "Fill Rate",
        }
    }

    pub fn value_format(&self) -> ValueFormat {
        match self {
            MetricKind::Revenue
            | MetricKind::Atv
            | MetricKind::Auv
            | MetricKind::Asv
            | MetricKind::Vat => ValueFormat::Currency,
            MetricKind::Transactions
            | MetricKind::Members
            | MetricKind::Units
            | MetricKind::CheckIns => ValueFormat::Count,
            MetricKind::Upt | MetricKind::ClassAverage => ValueFormat::Ratio,
            MetricKind::FillRate => ValueFormat::Percent,
        }
    }

    /// Whether bucket values may be summed into a roll-up.
    ///
    /// Distinct counts are not: a member active in two groups counts once in
    /// their union.
    pub fn sums_across_buckets(&self) -> bool {
        !matches!(self, MetricKind::Members)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = StudioMetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        MetricKind::ALL
            .into_iter()
            .find(|m| m.as_str() == needle)
            .ok_or_else(|| StudioMetricsError::UnknownMetric(s.to_string()))
    }
}

/// Raw sums over a bucket from which every metric is derived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    pub revenue: f64,
    pub vat: f64,
    pub transactions: usize,
    pub members: usize,
    pub check_ins: f64,
    pub capacity: f64,
}

impl BucketStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a BusinessRecord>) -> Self {
        let mut stats = BucketStats::default();
        let mut members: HashSet<&str> = HashSet::new();

        for record in records {
            stats.revenue += record.amount;
            stats.vat += record.vat;
            stats.transactions += 1;
            stats.check_ins += record.checked_in;
            stats.capacity += record.capacity;

            let id = record.entity_id.trim();
            if !id.is_empty() {
                members.insert(id);
            }
        }

        stats.members = members.len();
        stats
    }

    pub fn units(&self) -> usize {
        self.transactions
    }

    pub fn value(&self, metric: MetricKind) -> f64 {
        let revenue = self.revenue;
        let transactions = self.transactions as f64;
        let members = self.members as f64;
        let units = self.units() as f64;

        let value = match metric {
            MetricKind::Revenue => revenue,
            MetricKind::Transactions => transactions,
            MetricKind::Members => members,
            MetricKind::Units => units,
            MetricKind::Atv => safe_div(revenue, transactions),
            MetricKind::Auv => safe_div(revenue, units),
            MetricKind::Asv => safe_div(revenue, members),
            MetricKind::Upt => safe_div(units, transactions),
            MetricKind::Vat => self.vat,
            MetricKind::CheckIns => self.check_ins,
            MetricKind::ClassAverage => safe_div(self.check_ins, transactions),
            MetricKind::FillRate => safe_div(self.check_ins, self.capacity) * 100.0,
        };

        if value.is_finite() {
            value
        } else {
            0.0
        }
    }
}

pub fn compute_metric<'a>(
    records: impl IntoIterator<Item = &'a BusinessRecord>,
    metric: MetricKind,
) -> f64 {
    BucketStats::from_records(records).value(metric)
}

fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
