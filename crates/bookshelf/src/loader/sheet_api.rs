//! Client for the spreadsheet-backed JSON API.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{BookshelfError, Result};
use crate::input::Sheet;

/// Keys the API may use for the row payload, in lookup order.
const PAYLOAD_KEYS: [&str; 3] = ["data", "values", "rows"];

/// Anything that can fetch a named sheet.
///
/// Implementations must be thread-safe so one source can serve both sheets
/// of a load concurrently.
pub trait SheetSource: Send + Sync {
    /// Fetch all rows of `sheet`, header first.
    fn fetch_sheet(&self, sheet: &str) -> impl Future<Output = Result<Sheet>> + Send;

    /// Name of this source (for logging).
    fn name(&self) -> &str;
}

/// HTTP client for the sheet API.
pub struct SheetApiClient {
    client: Client,
    base_url: Url,
}

impl SheetApiClient {
    /// Create a client for the API at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| BookshelfError::Config(format!("Invalid sheet API URL '{}': {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BookshelfError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// URL requesting `sheet` as JSON, with a cache-busting timestamp.
    pub fn request_url(&self, sheet: &str, millis: i64) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("action", "getSheetData")
            .append_pair("sheet", sheet)
            .append_pair("format", "json")
            .append_pair("t", &millis.to_string());
        url
    }
}

impl SheetSource for SheetApiClient {
    async fn fetch_sheet(&self, sheet: &str) -> Result<Sheet> {
        let url = self.request_url(sheet, Utc::now().timestamp_millis());
        debug!(sheet, url = %url, "Fetching sheet");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(BookshelfError::SourceUnavailable(format!(
                "Sheet API returned HTTP {} for '{}'",
                response.status(),
                sheet
            )));
        }

        let payload: Value = response.json().await?;
        parse_sheet_payload(sheet, payload)
    }

    fn name(&self) -> &str {
        "sheet-api"
    }
}

/// Turn a sheet API response into a [`Sheet`].
///
/// Accepts rows under `data`, `values` or `rows`. Null cells become empty
/// strings and scalar cells are stringified.
pub fn parse_sheet_payload(sheet: &str, payload: Value) -> Result<Sheet> {
    if payload.get("success").and_then(Value::as_bool) == Some(false) {
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("request was not successful");
        return Err(BookshelfError::SourceUnavailable(format!(
            "Sheet API error for '{}': {}",
            sheet, message
        )));
    }

    let rows = PAYLOAD_KEYS
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_array))
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| BookshelfError::EmptyData(format!("Sheet API returned no rows for '{}'", sheet)))?;

    let rows = rows
        .iter()
        .map(|row| match row {
            Value::Array(cells) => cells.iter().map(cell_text).collect(),
            other => vec![cell_text(other)],
        })
        .collect();

    Sheet::from_rows(rows)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
