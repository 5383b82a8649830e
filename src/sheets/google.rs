// Google Sheets API v4 backend.
//
// Reads use UNFORMATTED_VALUE so numeric cells come back as JSON numbers; writes use
// USER_ENTERED so the sheet parses the value the same way a person typing it would.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::config::{ServiceAccountKey, SheetsConfig};
use super::auth::TokenProvider;
use super::{column_letters, quote_tab, SheetBackend, SheetError};

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

pub struct GoogleSheetsClient {
    client: reqwest::Client,
    tokens: TokenProvider,
    api_base: Url,
    spreadsheet_id: String,
    tab: Option<String>,
}

impl GoogleSheetsClient {
    pub fn new(config: &SheetsConfig, key: ServiceAccountKey) -> Result<Self, SheetError> {
        let client = reqwest::Client::new();
        let api_base = Url::parse(config.api_base.trim_end_matches('/'))
            .map_err(|e| SheetError::Decode(format!("invalid api base {}: {}", config.api_base, e)))?;
        Ok(Self {
            tokens: TokenProvider::new(key, client.clone())?,
            client,
            api_base,
            spreadsheet_id: config.spreadsheet_id.clone(),
            tab: config.tab.clone(),
        })
    }

    /// `{base}/spreadsheets/{id}` followed by `extra` path segments, each percent-encoded.
    fn spreadsheet_url(&self, extra: &[&str]) -> Result<Url, SheetError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| SheetError::Decode(format!("api base cannot hold a path: {}", self.api_base)))?
            .pop_if_empty()
            .push("spreadsheets")
            .push(&self.spreadsheet_id)
            .extend(extra);
        Ok(url)
    }

    /// The configured tab, or the title of the first tab in the spreadsheet.
    async fn tab_title(&self) -> Result<String, SheetError> {
        if let Some(tab) = &self.tab {
            return Ok(tab.clone());
        }

        let mut url = self.spreadsheet_url(&[])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties.title");
        let meta: SpreadsheetMeta = self.get_json(url).await?;
        meta.sheets
            .into_iter()
            .next()
            .map(|sheet| sheet.properties.title)
            .ok_or(SheetError::NoTabs)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T, SheetError> {
        let token = self.tokens.access_token().await?;
        let response = self.client.get(url.clone()).bearer_auth(token).send().await?;
        let response = check_status(&url, response).await?;
        response
            .json()
            .await
            .map_err(|e| SheetError::Decode(format!("{}: {}", url.path(), e)))
    }
}

async fn check_status(url: &Url, response: reqwest::Response) -> Result<reqwest::Response, SheetError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SheetError::Status {
        url: url.path().to_string(),
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl SheetBackend for GoogleSheetsClient {
    async fn read_rows(&self) -> Result<Vec<Vec<Value>>, SheetError> {
        let tab = self.tab_title().await?;
        let mut url = self.spreadsheet_url(&["values", quote_tab(&tab).as_str()])?;
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE");

        let range: ValueRange = self.get_json(url).await?;
        debug!("Read {} rows from tab {}", range.values.len(), tab);
        Ok(range.values)
    }

    async fn write_cell(&self, row: usize, column: usize, value: Value) -> Result<(), SheetError> {
        if row == 0 || column == 0 {
            return Err(SheetError::InvalidCell { row, column });
        }

        let tab = self.tab_title().await?;
        let a1 = format!("{}!{}{}", quote_tab(&tab), column_letters(column), row);
        let mut url = self.spreadsheet_url(&["values", a1.as_str()])?;
        url.query_pairs_mut().append_pair("valueInputOption", "USER_ENTERED");

        let body = json!({
            "range": &a1,
            "majorDimension": "ROWS",
            "values": [[value]],
        });

        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .put(url.clone())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        check_status(&url, response).await?;

        debug!("Wrote cell {} in tab {}", a1, tab);
        Ok(())
    }
}
