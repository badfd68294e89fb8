//! # Studio Metrics
//!
//! Month-over-month performance tables for a fitness studio's business records
//! (sales, sessions, payroll, expirations and late cancellations).
//!
//! ## Core Concepts
//!
//! - **Records**: Raw sheet rows adapted into one strict [`BusinessRecord`] shape
//! - **Canonical Dates**: Source dates are `DD/MM/YYYY` first, with ISO and free-form fallbacks
//! - **Month Window**: A trailing run of calendar months ending at the anchor month
//! - **Metrics**: Revenue, transactions, unique members, units, class attendance and the ratios derived from them
//! - **Tables**: One row per group key, one cell per month, plus a TOTAL row
//!
//! ## Example
//!
//! ```rust
//! use studio_metrics::*;
//! use chrono::NaiveDate;
//!
//! let records = vec![
//!     BusinessRecord::new(RecordKind::Sales, "m1", "01/01/2024")
//!         .with_field(GroupField::Product, "X")
//!         .with_amount(50.0),
//!     BusinessRecord::new(RecordKind::Sales, "m2", "15/02/2024")
//!         .with_field(GroupField::Product, "X")
//!         .with_amount(70.0),
//!     BusinessRecord::new(RecordKind::Sales, "m3", "01/01/2024")
//!         .with_field(GroupField::Product, "Y")
//!         .with_amount(200.0),
//! ];
//!
//! let config = TableConfig {
//!     month_window: 2,
//!     order: MonthOrder::OldestFirst,
//!     as_of: NaiveDate::from_ymd_opt(2024, 2, 29),
//! };
//!
//! let table = build_table(&records, &GroupField::Product, &config, MetricKind::Revenue).unwrap();
//! assert_eq!(table.row_labels(), vec!["Y", "X"]);
//! assert_eq!(table.total.cells, vec![250.0, 70.0]);
//! ```

pub mod dates;
pub mod engine;
pub mod error;
pub mod filters;
pub mod growth;
pub mod grouping;
pub mod ingestion;
pub mod metrics;
pub mod schema;
pub mod summary;
pub mod utils;

#[cfg(feature = "sheets")]
pub mod sheets;

pub use dates::{normalize, CanonicalDate};
pub use engine::{build_table, RowKind, TableRow, TimeSeriesAssembler, TimeSeriesTable};
pub use error::{Result, StudioMetricsError};
pub use filters::{DateRange, RecordFilter, MIN_SESSION_CHECK_INS, SESSION_EXCLUDED_KEYWORDS};
pub use growth::{annotate, annotate_series, growth_percent, Direction, GROWTH_THRESHOLD_PCT};
pub use grouping::{group_nested, group_records, GroupBucket, GroupKeyFn, NestedBucket};
pub use ingestion::{adapt_rows, parse_numeric, ColumnMapping, SheetRows};
pub use metrics::{compute_metric, BucketStats, MetricKind, ValueFormat};
pub use schema::*;
pub use summary::{ExpirationSummary, SummaryMetrics};
pub use utils::*;

use log::info;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Everything needed to turn a record set into one dashboard view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ReportRequest {
    #[schemars(description = "Attribute whose values become the table's rows")]
    pub group_by: GroupField,

    #[serde(default)]
    #[schemars(description = "Optional second attribute nesting child rows under each row")]
    pub sub_group_by: Option<GroupField>,

    pub metric: MetricKind,

    #[serde(default)]
    pub table: TableConfig,

    #[serde(default)]
    pub filter: RecordFilter,
}

impl ReportRequest {
    pub fn new(group_by: GroupField, metric: MetricKind) -> Self {
        Self {
            group_by,
            sub_group_by: None,
            metric,
            table: TableConfig::default(),
            filter: RecordFilter::default(),
        }
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportRequest)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub summary: SummaryMetrics,
    pub expirations: ExpirationSummary,
    pub table: TimeSeriesTable,
    /// Records remaining after the filter was applied.
    pub record_count: usize,
}

pub struct ReportBuilder;

impl ReportBuilder {
    /// Filters `records`, then computes the summary cards and the table.
    pub fn build(records: &[BusinessRecord], request: &ReportRequest) -> Result<Report> {
        request.filter.validate()?;
        let assembler = TimeSeriesAssembler::new(request.table.clone())?;

        let filtered = request.filter.apply(records);
        info!(
            "Building {} report by {:?} over {} of {} records",
            request.metric,
            request.group_by,
            filtered.len(),
            records.len()
        );

        let table = match request.sub_group_by {
            Some(child) => {
                assembler.build_nested(&filtered, &request.group_by, &child, request.metric)
            }
            None => assembler.build(&filtered, &request.group_by, request.metric),
        };

        Ok(Report {
            summary: SummaryMetrics::from_records(&filtered),
            expirations: ExpirationSummary::from_records(&filtered),
            table,
            record_count: filtered.len(),
        })
    }
}

pub fn build_report(records: &[BusinessRecord], request: &ReportRequest) -> Result<Report> {
    ReportBuilder::build(records, request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sales() -> Vec<BusinessRecord> {
        vec![
            BusinessRecord::new(RecordKind::Sales, "m1", "05/01/2024")
                .with_field(GroupField::Category, "Memberships")
                .with_field(GroupField::Product, "Monthly Unlimited")
                .with_field(GroupField::Location, "Kwality House")
                .with_amount(4000.0),
            BusinessRecord::new(RecordKind::Sales, "m2", "06/02/2024")
                .with_field(GroupField::Category, "Class Packs")
                .with_field(GroupField::Product, "10 Class Pack")
                .with_field(GroupField::Location, "Kwality House")
                .with_amount(2500.0),
            BusinessRecord::new(RecordKind::Sales, "m3", "07/02/2024")
                .with_field(GroupField::Category, "Memberships")
                .with_field(GroupField::Product, "Annual")
                .with_field(GroupField::Location, "Supreme HQ")
                .with_amount(30000.0),
        ]
    }

    fn request() -> ReportRequest {
        let mut request = ReportRequest::new(GroupField::Category, MetricKind::Revenue);
        request.table.month_window = 2;
        request.table.as_of = NaiveDate::from_ymd_opt(2024, 2, 15);
        request
    }

    #[test]
    fn test_build_report_applies_filter_to_summary_and_table() {
        let mut request = request();
        request.filter.locations = vec!["kwality".to_string()];

        let report = build_report(&sales(), &request).unwrap();
        assert_eq!(report.record_count, 2);
        assert_eq!(report.summary.revenue, 6500.0);
        assert_eq!(report.table.total.cells, vec![4000.0, 2500.0]);
        assert_eq!(report.table.row_labels(), vec!["Memberships", "Class Packs"]);
    }

    #[test]
    fn test_build_report_nested() {
        let mut request = request();
        request.sub_group_by = Some(GroupField::Product);

        let report = build_report(&sales(), &request).unwrap();
        let memberships = report.table.row("Memberships").unwrap();
        assert_eq!(memberships.children.len(), 2);
        assert_eq!(memberships.cells, vec![4000.0, 30000.0]);
    }

    #[test]
    fn test_build_report_attendance_by_trainer() {
        let session = |class: &str, trainer: &str, checked_in: f64| {
            BusinessRecord::new(RecordKind::Session, "s", "12/02/2024")
                .with_field(GroupField::Product, class)
                .with_field(GroupField::Trainer, trainer)
                .with_attendance(checked_in, 20.0)
        };
        let records = vec![
            session("Barre 57", "Anisha", 12.0),
            session("Barre 57", "Anisha", 8.0),
            session("Hosted Class", "Anisha", 20.0),
            session("Mat 57", "Vivaran", 1.0),
        ];

        let mut request = ReportRequest {
            filter: RecordFilter::attendance(),
            ..ReportRequest::new(GroupField::Trainer, MetricKind::ClassAverage)
        };
        request.table.month_window = 1;
        request.table.as_of = NaiveDate::from_ymd_opt(2024, 2, 29);

        let report = build_report(&records, &request).unwrap();
        assert_eq!(report.record_count, 2);
        assert_eq!(report.table.row_labels(), vec!["Anisha"]);
        assert_eq!(report.table.total.cells, vec![10.0]);
        assert_eq!(report.expirations.total_memberships, 0);
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let mut request = request();
        request.filter.min_amount = Some(10.0);
        request.filter.max_amount = Some(1.0);
        assert!(matches!(
            build_report(&sales(), &request),
            Err(StudioMetricsError::InvalidAmountRange { .. })
        ));
    }

    #[test]
    fn test_request_schema_and_minimal_json() {
        let schema = ReportRequest::schema_as_json().unwrap();
        assert!(schema.contains("group_by"));
        assert!(schema.contains("sub_group_by"));

        let request: ReportRequest =
            serde_json::from_str(r#"{"group_by":"sold_by","metric":"atv"}"#).unwrap();
        assert_eq!(request.group_by, GroupField::SoldBy);
        assert_eq!(request.metric, MetricKind::Atv);
        assert_eq!(request.table, TableConfig::default());
    }
}
