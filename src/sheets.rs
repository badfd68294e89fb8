use crate::error::{Result, StudioMetricsError};
use crate::ingestion::{adapt_rows, SheetRows};
use crate::schema::{BusinessRecord, RecordKind};
use futures::future::try_join_all;
use log::{debug, info, warn};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com/v4";

/// Credentials and endpoints for the spreadsheet backing a studio's data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SheetsConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub spreadsheet_id: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl SheetsConfig {
    /// Reads `STUDIO_SHEETS_CLIENT_ID`, `STUDIO_SHEETS_CLIENT_SECRET`,
    /// `STUDIO_SHEETS_REFRESH_TOKEN` and `STUDIO_SHEETS_SPREADSHEET_ID`.
    /// The two endpoint variables are optional.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client_id: required_var("STUDIO_SHEETS_CLIENT_ID")?,
            client_secret: required_var("STUDIO_SHEETS_CLIENT_SECRET")?,
            refresh_token: required_var("STUDIO_SHEETS_REFRESH_TOKEN")?,
            spreadsheet_id: required_var("STUDIO_SHEETS_SPREADSHEET_ID")?,
            token_url: env::var("STUDIO_SHEETS_TOKEN_URL").unwrap_or_else(|_| default_token_url()),
            api_base_url: env::var("STUDIO_SHEETS_API_BASE_URL")
                .unwrap_or_else(|_| default_api_base_url()),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    env::var(name).map_err(|_| StudioMetricsError::Authentication(format!("{} must be set", name)))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SheetLookup {
    Found(SheetRows),
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SheetResolution {
    Found { sheet: String, rows: SheetRows },
    NotFound { tried: Vec<String> },
}

/// One dataset and the sheet names it may live under, in preference order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetSource {
    pub kind: RecordKind,
    pub candidate_sheets: Vec<String>,
}

impl DatasetSource {
    pub fn new(kind: RecordKind, candidate_sheets: &[&str]) -> Self {
        Self {
            kind,
            candidate_sheets: candidate_sheets.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Sheet names the studio's exports have used for each dataset.
    pub fn default_for(kind: RecordKind) -> Self {
        let candidates: &[&str] = match kind {
            RecordKind::Sales => &["Sales", "Payments", "Sheet1"],
            RecordKind::Session => &["Sessions", "Classes", "Sheet1"],
            RecordKind::Payroll => &["Payroll", "Teacher Payroll", "Sheet1"],
            RecordKind::Expiration => &["Expirations", "Expiration", "Members", "Sheet1", "Data"],
            RecordKind::LateCancellation => &["Late Cancellations", "LateCancellations", "Sheet1"],
        };
        Self::new(kind, candidates)
    }
}

#[derive(Clone)]
pub struct SheetsClient {
    client: Client,
    config: SheetsConfig,
}

impl SheetsClient {
    pub fn new(config: SheetsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn with_client(config: SheetsConfig, client: Client) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    /// Exchanges the configured refresh token for a short-lived access token.
    pub async fn access_token(&self) -> Result<String> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", self.config.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let res = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let error_text = res.text().await?;
            return Err(StudioMetricsError::Authentication(format!(
                "token endpoint returned {}: {}",
                status, error_text
            )));
        }

        let body: TokenResponse = res.json().await?;
        match body.access_token {
            Some(token) => {
                debug!("Obtained sheets access token");
                Ok(token)
            }
            None => Err(StudioMetricsError::Authentication(
                body.error.unwrap_or_else(|| "no access token in response".to_string()),
            )),
        }
    }

    pub async fn fetch_sheet(&self, token: &str, sheet: &str) -> Result<SheetLookup> {
        let url = values_url(&self.config.api_base_url, &self.config.spreadsheet_id, sheet)?;

        let res = self.client.get(url).bearer_auth(token).send().await?;
        let status = res.status();

        // A missing tab is reported as an unparseable range.
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            debug!("Sheet '{}' not found ({})", sheet, status);
            return Ok(SheetLookup::NotFound);
        }
        if !status.is_success() {
            let error_text = res.text().await?;
            return Err(StudioMetricsError::SourceFailed(format!(
                "Fetching sheet '{}' failed (status {}): {}",
                sheet, status, error_text
            )));
        }

        let range: ValueRange = res.json().await?;
        Ok(SheetLookup::Found(SheetRows::from_values(range.values)?))
    }

    pub async fn resolve_first_available(
        &self,
        token: &str,
        candidates: &[String],
    ) -> Result<SheetResolution> {
        for sheet in candidates {
            if let SheetLookup::Found(rows) = self.fetch_sheet(token, sheet).await? {
                info!("Using sheet '{}' ({} rows)", sheet, rows.rows.len());
                return Ok(SheetResolution::Found {
                    sheet: sheet.clone(),
                    rows,
                });
            }
        }

        warn!("None of the sheets {:?} exist", candidates);
        Ok(SheetResolution::NotFound {
            tried: candidates.to_vec(),
        })
    }

    pub async fn fetch_records(&self, source: &DatasetSource) -> Result<Vec<BusinessRecord>> {
        let token = self.access_token().await?;
        self.fetch_records_with_token(&token, source).await
    }

    /// Fetches every source concurrently with a single access token.
    /// Fails as a whole if any source fails.
    pub async fn fetch_all(&self, sources: &[DatasetSource]) -> Result<Vec<Vec<BusinessRecord>>> {
        let token = self.access_token().await?;
        try_join_all(
            sources
                .iter()
                .map(|source| self.fetch_records_with_token(&token, source)),
        )
        .await
    }

    async fn fetch_records_with_token(
        &self,
        token: &str,
        source: &DatasetSource,
    ) -> Result<Vec<BusinessRecord>> {
        match self
            .resolve_first_available(token, &source.candidate_sheets)
            .await?
        {
            SheetResolution::Found { rows, .. } => adapt_rows(source.kind, &rows),
            SheetResolution::NotFound { tried } => {
                Err(StudioMetricsError::SheetNotFound(tried.join(", ")))
            }
        }
    }
}

fn values_url(base: &str, spreadsheet_id: &str, sheet: &str) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| StudioMetricsError::SourceFailed(format!("Invalid API base URL: {}", e)))?;

    url.path_segments_mut()
        .map_err(|_| StudioMetricsError::SourceFailed(format!("API base URL cannot be a base: {}", base)))?
        .pop_if_empty()
        .extend(&["spreadsheets", spreadsheet_id, "values", sheet]);

    url.query_pairs_mut().append_pair("alt", "json");
    Ok(url)
}
