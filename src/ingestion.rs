use crate::error::{Result, StudioMetricsError};
use crate::schema::{BusinessRecord, GroupField, RecordKind};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Raw tabular data as returned by a spreadsheet range: one header row and
/// string cells. Rows may be shorter than the header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetRows {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetRows {
    /// Splits a raw value range into header and data rows.
    pub fn from_values(mut values: Vec<Vec<String>>) -> Result<Self> {
        if values.is_empty() {
            return Err(StudioMetricsError::EmptySheet);
        }
        let header = values.remove(0);
        Ok(Self {
            header,
            rows: values,
        })
    }
}

/// Destination of a sheet column in [`BusinessRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaField {
    EntityId,
    OccurredAt,
    Group(GroupField),
    Amount,
    Vat,
    Discount,
    CheckedIn,
    Capacity,
}

impl SchemaField {
    fn name(&self) -> &'static str {
        match self {
            SchemaField::EntityId => "entity_id",
            SchemaField::OccurredAt => "occurred_at",
            SchemaField::Group(GroupField::Category) => "category",
            SchemaField::Group(GroupField::Product) => "product",
            SchemaField::Group(GroupField::Trainer) => "trainer",
            SchemaField::Group(GroupField::PaymentMethod) => "payment_method",
            SchemaField::Group(GroupField::Location) => "location",
            SchemaField::Group(GroupField::SoldBy) => "sold_by",
            SchemaField::Group(GroupField::Status) => "status",
            SchemaField::Amount => "amount",
            SchemaField::Vat => "vat",
            SchemaField::Discount => "discount",
            SchemaField::CheckedIn => "checked_in",
            SchemaField::Capacity => "capacity",
        }
    }
}

/// Accepted header spellings for one schema field, in priority order.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub field: SchemaField,
    pub headers: Vec<&'static str>,
    pub required: bool,
}

impl ColumnSpec {
    fn optional(field: SchemaField, headers: &[&'static str]) -> Self {
        Self {
            field,
            headers: headers.to_vec(),
            required: false,
        }
    }

    fn required(field: SchemaField, headers: &[&'static str]) -> Self {
        Self {
            field,
            headers: headers.to_vec(),
            required: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnMapping {
    pub kind: RecordKind,
    pub columns: Vec<ColumnSpec>,
}

impl ColumnMapping {
    pub fn for_kind(kind: RecordKind) -> Self {
        use GroupField::*;
        use SchemaField::*;

        let columns = match kind {
            RecordKind::Sales => vec![
                ColumnSpec::optional(EntityId, &["Member ID", "MemberID", "Customer ID"]),
                ColumnSpec::required(OccurredAt, &["Payment Date", "PaymentDate", "Date"]),
                ColumnSpec::optional(Group(Category), &["Cleaned Category", "Category"]),
                ColumnSpec::optional(Group(Product), &["Cleaned Product", "Product", "Item"]),
                ColumnSpec::optional(Group(PaymentMethod), &["Payment Method", "PaymentMethod"]),
                ColumnSpec::optional(Group(Location), &["Calculated Location", "Location"]),
                ColumnSpec::optional(Group(SoldBy), &["Sold By", "SoldBy"]),
                ColumnSpec::optional(Group(Status), &["Payment Status", "Status"]),
                ColumnSpec::optional(Amount, &["Payment Value", "PaymentValue", "Amount"]),
                ColumnSpec::optional(Vat, &["Payment VAT", "PaymentVAT", "VAT"]),
                ColumnSpec::optional(Discount, &["Discount Amount", "Discount"]),
            ],
            RecordKind::Session => vec![
                ColumnSpec::optional(EntityId, &["Session ID", "SessionID", "Trainer ID"]),
                ColumnSpec::required(OccurredAt, &["Date", "Session Date"]),
                ColumnSpec::optional(Group(Category), &["Class Type", "Type", "Format"]),
                ColumnSpec::optional(Group(Product), &["Cleaned Class", "Class Name", "Class"]),
                ColumnSpec::optional(Group(Trainer), &["Trainer Name", "Teacher Name", "Trainer"]),
                ColumnSpec::optional(Group(Location), &["Location", "Studio"]),
                ColumnSpec::optional(Group(Status), &["Status"]),
                ColumnSpec::optional(Amount, &["Total Paid", "Revenue", "Paid"]),
                ColumnSpec::optional(CheckedIn, &["Checked In", "Checked In Count", "CheckedIn"]),
                ColumnSpec::optional(Capacity, &["Capacity", "Total Capacity", "Class Capacity"]),
            ],
            RecordKind::Payroll => vec![
                ColumnSpec::optional(EntityId, &["Teacher ID", "TeacherID", "Teacher Id"]),
                ColumnSpec::required(OccurredAt, &["Month Year", "MonthYear", "Month"]),
                ColumnSpec::optional(Group(Trainer), &["Teacher Name", "TeacherName", "Trainer Name"]),
                ColumnSpec::optional(Group(Location), &["Location"]),
                ColumnSpec::optional(Amount, &["Total Paid", "TotalPaid", "Paid"]),
            ],
            RecordKind::Expiration => vec![
                ColumnSpec::optional(EntityId, &["Member ID", "MemberID", "Unique Id", "UniqueId"]),
                ColumnSpec::required(OccurredAt, &["End Date", "EndDate"]),
                ColumnSpec::optional(Group(Product), &["Membership Name", "MembershipName"]),
                ColumnSpec::optional(Group(Location), &["Home Location", "HomeLocation"]),
                ColumnSpec::optional(Group(SoldBy), &["Sold By", "SoldBy"]),
                ColumnSpec::optional(Group(Status), &["Status"]),
                ColumnSpec::optional(Amount, &["Paid", "Amount Paid"]),
            ],
            RecordKind::LateCancellation => vec![
                ColumnSpec::optional(EntityId, &["Member ID", "MemberID", "Customer ID"]),
                ColumnSpec::required(OccurredAt, &["Cancelled Date", "Date", "Session Date"]),
                ColumnSpec::optional(Group(Category), &["Cleaned Category", "Category"]),
                ColumnSpec::optional(Group(Product), &["Cleaned Class", "Class Name", "Class"]),
                ColumnSpec::optional(Group(Trainer), &["Teacher Name", "Trainer Name", "Trainer"]),
                ColumnSpec::optional(Group(Location), &["Location"]),
                ColumnSpec::optional(Amount, &["Charged Penalty Amount", "Penalty", "Amount"]),
            ],
        };

        Self { kind, columns }
    }

    /// Resolves each column to its index in `header`.
    ///
    /// Exact matches win; otherwise header names are compared ignoring case
    /// and whitespace.
    fn resolve(&self, header: &[String]) -> Result<Vec<(SchemaField, usize)>> {
        let mut resolved = Vec::new();

        for column in &self.columns {
            match find_column(header, &column.headers) {
                Some(idx) => resolved.push((column.field, idx)),
                None if column.required => {
                    return Err(StudioMetricsError::MissingColumn {
                        kind: self.kind.to_string(),
                        column: column.field.name().to_string(),
                        accepted: column.headers.join(", "),
                    });
                }
                None => debug!(
                    "No column for {} in {} sheet, leaving it empty",
                    column.field.name(),
                    self.kind
                ),
            }
        }

        Ok(resolved)
    }
}

fn find_column(header: &[String], accepted: &[&str]) -> Option<usize> {
    accepted
        .iter()
        .find_map(|name| header.iter().position(|h| h == name))
        .or_else(|| {
            let wanted: Vec<String> = accepted.iter().map(|a| squash(a)).collect();
            header.iter().position(|h| wanted.contains(&squash(h)))
        })
}

fn squash(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Parses a spreadsheet number, tolerating thousands separators, currency
/// symbols and blanks. Anything unparseable is zero.
pub fn parse_numeric(value: &str) -> f64 {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, ',' | '₹' | '$' | '€' | '£') && !c.is_whitespace())
        .collect();

    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Converts raw sheet rows into strict records of `kind`.
///
/// Rows with no non-blank cell are skipped. Blank categorical cells become
/// `None`; the grouping sentinel is applied at aggregation time.
pub fn adapt_rows(kind: RecordKind, sheet: &SheetRows) -> Result<Vec<BusinessRecord>> {
    let mapping = ColumnMapping::for_kind(kind);
    let columns = mapping.resolve(&sheet.header)?;

    let mut records = Vec::with_capacity(sheet.rows.len());
    let mut skipped = 0;

    for row in &sheet.rows {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            skipped += 1;
            continue;
        }

        let mut record = BusinessRecord::new(kind, "", "");
        for (field, idx) in &columns {
            let cell = row.get(*idx).map(|c| c.trim()).unwrap_or("");
            match field {
                SchemaField::EntityId => record.entity_id = cell.to_string(),
                SchemaField::OccurredAt => record.occurred_at = cell.to_string(),
                SchemaField::Group(group) => {
                    *record.field_mut(*group) = (!cell.is_empty()).then(|| cell.to_string());
                }
                SchemaField::Amount => record.amount = parse_numeric(cell),
                SchemaField::Vat => record.vat = parse_numeric(cell),
                SchemaField::Discount => record.discount = parse_numeric(cell),
                SchemaField::CheckedIn => record.checked_in = parse_numeric(cell),
                SchemaField::Capacity => record.capacity = parse_numeric(cell),
            }
        }
        records.push(record);
    }

    info!(
        "Adapted {} {} records ({} empty rows skipped)",
        records.len(),
        kind,
        skipped
    );

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric("1,234.50"), 1234.5);
        assert_eq!(parse_numeric("₹ 2,000"), 2000.0);
        assert_eq!(parse_numeric(""), 0.0);
        assert_eq!(parse_numeric("n/a"), 0.0);
        assert_eq!(parse_numeric("NaN"), 0.0);
        assert_eq!(parse_numeric("-15"), -15.0);
    }

    #[test]
    fn test_from_values_requires_header() {
        assert!(SheetRows::from_values(vec![]).is_err());
        let sheet = SheetRows::from_values(vec![strings(&["Date"]), strings(&["01/01/2024"])]).unwrap();
        assert_eq!(sheet.header, strings(&["Date"]));
        assert_eq!(sheet.rows.len(), 1);
    }

    #[test]
    fn test_adapt_sales_rows() {
        let sheet = SheetRows {
            header: strings(&[
                "Member ID",
                "Payment Date",
                "Cleaned Category",
                "Cleaned Product",
                "Payment Value",
                "Payment VAT",
            ]),
            rows: vec![
                strings(&["m1", "01/01/2024", "Memberships", "Monthly", "4,500", "810"]),
                strings(&["", "", "", "", "", ""]),
                strings(&["m2", "15/02/2024", "", "Drop In"]),
            ],
        };

        let records = adapt_rows(RecordKind::Sales, &sheet).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].entity_id, "m1");
        assert_eq!(records[0].amount, 4500.0);
        assert_eq!(records[0].vat, 810.0);
        assert_eq!(records[0].category.as_deref(), Some("Memberships"));
        assert_eq!(records[1].category, None);
        assert_eq!(records[1].product.as_deref(), Some("Drop In"));
        assert_eq!(records[1].amount, 0.0);
    }

    #[test]
    fn test_alternate_header_spellings() {
        let sheet = SheetRows {
            header: strings(&["MemberID", "EndDate", "membership name", "HomeLocation"]),
            rows: vec![strings(&["m9", "2024-05-31", "Annual Unlimited", "Kenkere House"])],
        };

        let records = adapt_rows(RecordKind::Expiration, &sheet).unwrap();
        assert_eq!(records[0].entity_id, "m9");
        assert_eq!(records[0].occurred_at, "2024-05-31");
        assert_eq!(records[0].product.as_deref(), Some("Annual Unlimited"));
        assert_eq!(records[0].location.as_deref(), Some("Kenkere House"));
    }

    #[test]
    fn test_adapt_session_attendance() {
        let sheet = SheetRows {
            header: strings(&["Date", "Cleaned Class", "Trainer Name", "Checked In", "Capacity"]),
            rows: vec![strings(&["05/03/2024 07:30:00", "Barre 57", "Anisha", "11", "14"])],
        };

        let records = adapt_rows(RecordKind::Session, &sheet).unwrap();
        assert_eq!(records[0].product.as_deref(), Some("Barre 57"));
        assert_eq!(records[0].trainer.as_deref(), Some("Anisha"));
        assert_eq!(records[0].checked_in, 11.0);
        assert_eq!(records[0].capacity, 14.0);
    }

    #[test]
    fn test_missing_date_column_is_an_error() {
        let sheet = SheetRows {
            header: strings(&["Member ID", "Payment Value"]),
            rows: vec![strings(&["m1", "100"])],
        };

        let err = adapt_rows(RecordKind::Sales, &sheet).unwrap_err();
        assert!(matches!(err, StudioMetricsError::MissingColumn { .. }));
        assert!(err.to_string().contains("Payment Date"));
    }

    #[test]
    fn test_every_kind_has_a_required_date_column() {
        for kind in [
            RecordKind::Sales,
            RecordKind::Session,
            RecordKind::Payroll,
            RecordKind::Expiration,
            RecordKind::LateCancellation,
        ] {
            let mapping = ColumnMapping::for_kind(kind);
            assert!(mapping
                .columns
                .iter()
                .any(|c| c.field == SchemaField::OccurredAt && c.required));
        }
    }
}
