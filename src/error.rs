use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudioMetricsError {
    #[error("Invalid month window {0}: must be between 1 and {max}", max = crate::utils::MAX_MONTH_WINDOW)]
    InvalidMonthWindow(usize),

    #[error("Unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("Invalid amount range: min {min} is greater than max {max}")]
    InvalidAmountRange { min: f64, max: f64 },

    #[error("Missing required column '{column}' for {kind} records (accepted headers: {accepted})")]
    MissingColumn {
        kind: String,
        column: String,
        accepted: String,
    },

    #[error("Sheet has no header row")]
    EmptySheet,

    #[error("No sheet found among candidates: {0}")]
    SheetNotFound(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Data source request failed: {0}")]
    SourceFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[cfg(feature = "sheets")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, StudioMetricsError>;
