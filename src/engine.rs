use crate::dates::normalize;
use crate::error::Result;
use crate::growth::{annotate_series, Direction};
use crate::grouping::{partition, GroupKeyFn};
use crate::metrics::{compute_metric, MetricKind};
use crate::schema::{BusinessRecord, MonthOrder, TableConfig};
use crate::utils::{month_window, months_between, MonthKey};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Group,
    Total,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableRow {
    pub label: String,
    pub kind: RowKind,
    pub cells: Vec<f64>,
    pub trend: Vec<Direction>,
    // Covers dated records outside the window too; rows sort on it.
    pub overall: f64,
    pub record_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TableRow>,
}

impl TableRow {
    pub fn child(&self, label: &str) -> Option<&TableRow> {
        self.children.iter().find(|c| c.label == label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSeriesTable {
    pub metric: MetricKind,
    pub months: Vec<MonthKey>,
    pub rows: Vec<TableRow>,
    pub total: TableRow,
    pub skipped_invalid_dates: usize,
}

impl TimeSeriesTable {
    pub fn month_index(&self, month: MonthKey) -> Option<usize> {
        self.months.iter().position(|m| *m == month)
    }

    pub fn row(&self, label: &str) -> Option<&TableRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    pub fn row_labels(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.label.as_str()).collect()
    }

    pub fn cell(&self, label: &str, month: MonthKey) -> Option<f64> {
        let idx = self.month_index(month)?;
        self.row(label).map(|r| r.cells[idx])
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Copy)]
struct DatedRecord<'a> {
    record: &'a BusinessRecord,
    column: Option<usize>,
}

// The window is contiguous, so a month's column is its offset from the oldest.
struct ColumnIndex {
    oldest: MonthKey,
    width: usize,
    order: MonthOrder,
}

impl ColumnIndex {
    fn new(months: &[MonthKey], order: MonthOrder) -> Self {
        let oldest = months.iter().min().copied().unwrap_or(MonthKey {
            year: 0,
            month: 1,
        });
        Self {
            oldest,
            width: months.len(),
            order,
        }
    }

    fn column_of(&self, month: MonthKey) -> Option<usize> {
        let offset = usize::try_from(months_between(self.oldest, month)).ok()?;
        if offset >= self.width {
            return None;
        }
        Some(match self.order {
            MonthOrder::OldestFirst => offset,
            MonthOrder::NewestFirst => self.width - 1 - offset,
        })
    }
}

pub struct TimeSeriesAssembler {
    config: TableConfig,
}

impl TimeSeriesAssembler {
    pub fn new(config: TableConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn months(&self) -> Vec<MonthKey> {
        month_window(
            self.config.anchor_date(),
            self.config.month_window,
            self.config.order,
        )
    }

    pub fn build<K>(&self, records: &[BusinessRecord], key: &K, metric: MetricKind) -> TimeSeriesTable
    where
        K: GroupKeyFn + ?Sized,
    {
        let months = self.months();
        let (dated, skipped) = self.resolve_dates(records, &months);
        let width = months.len();

        let mut rows: Vec<TableRow> = partition(dated.iter().copied(), |d| key.group_key(d.record))
            .into_iter()
            .map(|(label, items)| build_row(label, &items, width, metric))
            .collect();
        sort_rows(&mut rows);

        let total = roll_up("TOTAL".to_string(), RowKind::Total, &rows, &dated, width, metric);

        debug!(
            "Assembled {} table: {} rows x {} months ({} records, {} skipped for invalid dates)",
            metric,
            rows.len(),
            width,
            dated.len(),
            skipped
        );

        TimeSeriesTable {
            metric,
            months,
            rows,
            total,
            skipped_invalid_dates: skipped,
        }
    }

    pub fn build_nested<P, C>(
        &self,
        records: &[BusinessRecord],
        parent: &P,
        child: &C,
        metric: MetricKind,
    ) -> TimeSeriesTable
    where
        P: GroupKeyFn + ?Sized,
        C: GroupKeyFn + ?Sized,
    {
        let months = self.months();
        let (dated, skipped) = self.resolve_dates(records, &months);
        let width = months.len();

        let mut rows: Vec<TableRow> =
            partition(dated.iter().copied(), |d| parent.group_key(d.record))
                .into_iter()
                .map(|(label, items)| {
                    let mut children: Vec<TableRow> =
                        partition(items.iter().copied(), |d| child.group_key(d.record))
                            .into_iter()
                            .map(|(child_label, child_items)| {
                                build_row(child_label, &child_items, width, metric)
                            })
                            .collect();
                    sort_rows(&mut children);

                    let mut row = roll_up(label, RowKind::Group, &children, &items, width, metric);
                    row.children = children;
                    row
                })
                .collect();
        sort_rows(&mut rows);

        let total = roll_up("TOTAL".to_string(), RowKind::Total, &rows, &dated, width, metric);

        debug!(
            "Assembled nested {} table: {} parent rows x {} months ({} records, {} skipped for invalid dates)",
            metric,
            rows.len(),
            width,
            dated.len(),
            skipped
        );

        TimeSeriesTable {
            metric,
            months,
            rows,
            total,
            skipped_invalid_dates: skipped,
        }
    }

    fn resolve_dates<'a>(
        &self,
        records: &'a [BusinessRecord],
        months: &[MonthKey],
    ) -> (Vec<DatedRecord<'a>>, usize) {
        let index = ColumnIndex::new(months, self.config.order);
        let mut skipped = 0;
        let mut dated = Vec::with_capacity(records.len());

        for record in records {
            match normalize(&record.occurred_at).month_key() {
                Some(month) => dated.push(DatedRecord {
                    record,
                    column: index.column_of(month),
                }),
                None => skipped += 1,
            }
        }

        (dated, skipped)
    }
}

pub fn build_table<K>(
    records: &[BusinessRecord],
    key: &K,
    config: &TableConfig,
    metric: MetricKind,
) -> Result<TimeSeriesTable>
where
    K: GroupKeyFn + ?Sized,
{
    let assembler = TimeSeriesAssembler::new(config.clone())?;
    Ok(assembler.build(records, key, metric))
}

fn bucket_by_column<'a>(items: &[DatedRecord<'a>], width: usize) -> Vec<Vec<&'a BusinessRecord>> {
    let mut buckets: Vec<Vec<&BusinessRecord>> = vec![Vec::new(); width];
    for item in items {
        if let Some(col) = item.column {
            buckets[col].push(item.record);
        }
    }
    buckets
}

fn per_month_values(items: &[DatedRecord<'_>], width: usize, metric: MetricKind) -> Vec<f64> {
    bucket_by_column(items, width)
        .iter()
        .map(|bucket| compute_metric(bucket.iter().copied(), metric))
        .collect()
}

fn build_row(label: String, items: &[DatedRecord<'_>], width: usize, metric: MetricKind) -> TableRow {
    let cells = per_month_values(items, width, metric);
    TableRow {
        label,
        kind: RowKind::Group,
        trend: annotate_series(&cells),
        cells,
        overall: compute_metric(items.iter().map(|d| d.record), metric),
        record_count: items.len(),
        children: Vec::new(),
    }
}

// Month cells sum `parts` column-wise, except distinct counts which are
// recomputed over `items`.
fn roll_up(
    label: String,
    kind: RowKind,
    parts: &[TableRow],
    items: &[DatedRecord<'_>],
    width: usize,
    metric: MetricKind,
) -> TableRow {
    let cells = if metric.sums_across_buckets() {
        (0..width)
            .map(|col| parts.iter().map(|row| row.cells[col]).sum())
            .collect()
    } else {
        per_month_values(items, width, metric)
    };

    TableRow {
        label,
        kind,
        trend: annotate_series(&cells),
        cells,
        overall: compute_metric(items.iter().map(|d| d.record), metric),
        record_count: items.len(),
        children: Vec::new(),
    }
}

fn sort_rows(rows: &mut [TableRow]) {
    rows.sort_by(|a, b| b.overall.partial_cmp(&a.overall).unwrap_or(Ordering::Equal));
}
