use crate::dates::normalize;
use crate::metrics::{BucketStats, MetricKind};
use crate::schema::{BusinessRecord, RecordKind};
use serde::{Deserialize, Serialize};

/// Headline figures shown above the sales tables.
///
/// Records whose date does not parse are left out, as they are from every
/// month-bucketed table, so the cards and the tables always agree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub revenue: f64,
    pub transactions: usize,
    pub unique_members: usize,
    pub vat: f64,
    pub average_transaction_value: f64,
    pub average_spend_per_member: f64,
    pub total_discount: f64,
    pub skipped_invalid_dates: usize,
}

impl SummaryMetrics {
    pub fn from_records(records: &[BusinessRecord]) -> Self {
        let (dated, undated): (Vec<&BusinessRecord>, Vec<&BusinessRecord>) = records
            .iter()
            .partition(|r| normalize(&r.occurred_at).is_valid());
        let stats = BucketStats::from_records(dated.iter().copied());

        Self {
            revenue: stats.value(MetricKind::Revenue),
            transactions: stats.transactions,
            unique_members: stats.members,
            vat: stats.value(MetricKind::Vat),
            average_transaction_value: stats.value(MetricKind::Atv),
            average_spend_per_member: stats.value(MetricKind::Asv),
            total_discount: dated.iter().map(|r| r.discount).sum(),
            skipped_invalid_dates: undated.len(),
        }
    }

    /// The value of a card keyed by metric, for metrics the summary covers.
    pub fn get(&self, metric: MetricKind) -> Option<f64> {
        match metric {
            MetricKind::Revenue => Some(self.revenue),
            MetricKind::Transactions => Some(self.transactions as f64),
            MetricKind::Members => Some(self.unique_members as f64),
            MetricKind::Vat => Some(self.vat),
            MetricKind::Atv => Some(self.average_transaction_value),
            MetricKind::Asv => Some(self.average_spend_per_member),
            _ => None,
        }
    }
}

pub const STATUS_EXPIRED: &str = "Expired";
pub const STATUS_EXPIRING_THIS_MONTH: &str = "Expiring This Month";
pub const STATUS_ACTIVE: &str = "Active";

/// Membership expiration cards. Counted by status over every expiration
/// record, whatever its end date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpirationSummary {
    pub total_memberships: usize,
    pub expired: usize,
    pub expiring_this_month: usize,
    pub active: usize,
    /// Expired as a percentage of all memberships.
    pub churn_rate: f64,
}

impl ExpirationSummary {
    pub fn from_records(records: &[BusinessRecord]) -> Self {
        let mut summary = Self::default();

        for record in records.iter().filter(|r| r.kind == RecordKind::Expiration) {
            summary.total_memberships += 1;
            let status = record.status.as_deref().unwrap_or("").trim();
            if status.eq_ignore_ascii_case(STATUS_EXPIRED) {
                summary.expired += 1;
            } else if status.eq_ignore_ascii_case(STATUS_EXPIRING_THIS_MONTH) {
                summary.expiring_this_month += 1;
            } else if status.eq_ignore_ascii_case(STATUS_ACTIVE) {
                summary.active += 1;
            }
        }

        if summary.total_memberships > 0 {
            summary.churn_rate =
                summary.expired as f64 / summary.total_memberships as f64 * 100.0;
        }
        summary
    }
}
