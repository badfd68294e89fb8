use crate::error::Result;
use crate::utils::{validate_month_window, DEFAULT_MONTH_WINDOW};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    #[schemars(description = "A sales transaction: one purchase of one product by one member")]
    Sales,

    #[schemars(description = "A scheduled class session with its trainer and attendance")]
    Session,

    #[schemars(description = "A monthly payroll row summarising a trainer's sessions and pay")]
    Payroll,

    #[schemars(description = "A membership approaching or past its end date")]
    Expiration,

    #[schemars(description = "A booking cancelled inside the late-cancellation window")]
    LateCancellation,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Sales => "sales",
            RecordKind::Session => "session",
            RecordKind::Payroll => "payroll",
            RecordKind::Expiration => "expiration",
            RecordKind::LateCancellation => "late cancellation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct BusinessRecord {
    pub kind: RecordKind,

    #[schemars(description = "Member, customer or teacher identifier. Not unique across records.")]
    pub entity_id: String,

    #[schemars(
        description = "Raw date string as exported by the source (DD/MM/YYYY, ISO or free-form). Normalized at aggregation time."
    )]
    pub occurred_at: String,

    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub trainer: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub sold_by: Option<String>,
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    #[schemars(description = "Payment value (sales) or amount paid (payroll, expirations)")]
    pub amount: f64,
    #[serde(default)]
    pub vat: f64,
    #[serde(default)]
    pub discount: f64,

    #[serde(default)]
    #[schemars(description = "Members checked in to a class session")]
    pub checked_in: f64,
    #[serde(default)]
    #[schemars(description = "Bookable spots in a class session")]
    pub capacity: f64,
}

impl BusinessRecord {
    pub fn new(
        kind: RecordKind,
        entity_id: impl Into<String>,
        occurred_at: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            occurred_at: occurred_at.into(),
            category: None,
            product: None,
            trainer: None,
            payment_method: None,
            location: None,
            sold_by: None,
            status: None,
            amount: 0.0,
            vat: 0.0,
            discount: 0.0,
            checked_in: 0.0,
            capacity: 0.0,
        }
    }

    pub fn with_field(mut self, field: GroupField, value: impl Into<String>) -> Self {
        *self.field_mut(field) = Some(value.into());
        self
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_vat(mut self, vat: f64) -> Self {
        self.vat = vat;
        self
    }

    pub fn with_discount(mut self, discount: f64) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_attendance(mut self, checked_in: f64, capacity: f64) -> Self {
        self.checked_in = checked_in;
        self.capacity = capacity;
        self
    }

    pub fn field(&self, field: GroupField) -> Option<&str> {
        let value = match field {
            GroupField::Category => &self.category,
            GroupField::Product => &self.product,
            GroupField::Trainer => &self.trainer,
            GroupField::PaymentMethod => &self.payment_method,
            GroupField::Location => &self.location,
            GroupField::SoldBy => &self.sold_by,
            GroupField::Status => &self.status,
        };
        value.as_deref()
    }

    pub(crate) fn field_mut(&mut self, field: GroupField) -> &mut Option<String> {
        match field {
            GroupField::Category => &mut self.category,
            GroupField::Product => &mut self.product,
            GroupField::Trainer => &mut self.trainer,
            GroupField::PaymentMethod => &mut self.payment_method,
            GroupField::Location => &mut self.location,
            GroupField::SoldBy => &mut self.sold_by,
            GroupField::Status => &mut self.status,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GroupField {
    Category,
    Product,
    Trainer,
    PaymentMethod,
    Location,
    SoldBy,
    Status,
}

impl GroupField {
    pub const ALL: [GroupField; 7] = [
        GroupField::Category,
        GroupField::Product,
        GroupField::Trainer,
        GroupField::PaymentMethod,
        GroupField::Location,
        GroupField::SoldBy,
        GroupField::Status,
    ];

    pub fn sentinel(&self) -> &'static str {
        match self {
            GroupField::Category => "Uncategorized",
            GroupField::Product => "Unspecified",
            _ => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MonthOrder {
    #[default]
    #[schemars(description = "Chronological columns, the anchor month last")]
    OldestFirst,

    #[schemars(description = "Reverse-chronological columns, the anchor month first")]
    NewestFirst,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct TableConfig {
    #[serde(default = "default_month_window")]
    #[schemars(description = "Number of trailing calendar months forming the column axis")]
    pub month_window: usize,

    #[serde(default)]
    pub order: MonthOrder,

    #[serde(default)]
    #[schemars(
        description = "Date whose month ends the window. Defaults to today's local date when absent."
    )]
    pub as_of: Option<NaiveDate>,
}

fn default_month_window() -> usize {
    DEFAULT_MONTH_WINDOW
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            month_window: DEFAULT_MONTH_WINDOW,
            order: MonthOrder::default(),
            as_of: None,
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> Result<()> {
        validate_month_window(self.month_window)
    }

    pub fn anchor_date(&self) -> NaiveDate {
        self.as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(TableConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
