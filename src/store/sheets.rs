use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{header::AUTHORIZATION, Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::{Column, RecordStore, Result};
use crate::{config::StoreConfig, errors::StoreError, models::ShortLinkRecord};

/// Record store backed by the Google Sheets v4 values API.
pub struct SheetsStore {
    client: Client,
    base: Url,
    spreadsheet_id: String,
    sheet_name: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetsStore {
    pub fn new(config: &StoreConfig, spreadsheet_id: String, access_token: String) -> Result<Self> {
        let base = Url::parse(&config.api_base)
            .map_err(|e| StoreError::Config(format!("invalid SHEETS_API_BASE: {}", e)))?;
        if base.cannot_be_a_base() {
            return Err(StoreError::Config(format!(
                "SHEETS_API_BASE is not a base URL: {}",
                config.api_base
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base,
            spreadsheet_id,
            sheet_name: config.sheet_name.clone(),
            access_token,
        })
    }

    /// `Sheet1!C:C`, quoting the sheet name when it is not a bare identifier
    fn range(&self, cells: &str) -> String {
        if self.sheet_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            format!("{}!{}", self.sheet_name, cells)
        } else {
            format!("'{}'!{}", self.sheet_name.replace('\'', "''"), cells)
        }
    }

    fn values_url(&self, segment: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Config("SHEETS_API_BASE is not a base URL".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", segment]);
        Ok(url)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status.as_u16(), body))
    }

    async fn get_range(&self, range: &str) -> Result<Vec<Vec<Value>>> {
        let url = self.values_url(range)?;
        debug!("Sheets GET {}", range);
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .send()
            .await?;
        let body = Self::check(response).await?.text().await?;
        decode_values(&body)
    }

    async fn send_values(&self, url: Url, put: bool, values: Value) -> Result<()> {
        let request = if put {
            self.client.put(url)
        } else {
            self.client.post(url)
        };
        let response = request
            .query(&[("valueInputOption", "RAW")])
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .json(&json!({ "values": values }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

fn status_error(status: u16, body: String) -> StoreError {
    StoreError::Status { status, body }
}

/// Rows of a `ValueRange` payload. Ranges with no data omit `values`.
fn decode_values(body: &str) -> Result<Vec<Vec<Value>>> {
    serde_json::from_str::<ValueRange>(body)
        .map(|payload| payload.values)
        .map_err(|e| StoreError::Decode(e.to_string()))
}

/// First cell of each row; cleared rows come back as empty arrays and are
/// kept as `""` to preserve positions
fn codes_from_rows(rows: &[Vec<Value>]) -> Vec<String> {
    rows.iter()
        .map(|row| row.first().map(cell_text).unwrap_or_default())
        .collect()
}

/// The single cell of a one-cell range, blank as `None`
fn cell_from_rows(rows: &[Vec<Value>]) -> Option<String> {
    rows.first()
        .and_then(|r| r.first())
        .map(cell_text)
        .filter(|v| !v.is_empty())
}

/// Sheets returns formatted strings, but RAW numbers may come back as numbers
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Counts are stored as numbers so the sheet can aggregate them
fn cell_value(column: Column, value: String) -> Value {
    if column == Column::Count {
        if let Ok(n) = value.parse::<u64>() {
            return json!(n);
        }
    }
    Value::String(value)
}

#[async_trait]
impl RecordStore for SheetsStore {
    async fn list_codes(&self) -> Result<Vec<String>> {
        let rows = self.get_range(&self.range("C:C")).await?;
        Ok(codes_from_rows(&rows))
    }

    async fn read_cell(&self, row: usize, column: Column) -> Result<Option<String>> {
        let cell = format!("{}{}", column.letter(), row);
        let rows = self.get_range(&self.range(&cell)).await?;
        Ok(cell_from_rows(&rows))
    }

    async fn write_cell(&self, row: usize, column: Column, value: String) -> Result<()> {
        let cell = format!("{}{}", column.letter(), row);
        let url = self.values_url(&self.range(&cell))?;
        debug!("Sheets PUT {}", cell);
        self.send_values(url, true, json!([[cell_value(column, value)]]))
            .await
    }

    async fn append_row(&self, record: &ShortLinkRecord) -> Result<()> {
        let url = self.values_url(&format!("{}:append", self.range("A:F")))?;
        let row: Vec<Value> = Column::ALL
            .iter()
            .zip(record.to_row())
            .map(|(column, value)| cell_value(*column, value))
            .collect();
        debug!("Sheets APPEND {}", record.short_code);
        self.send_values(url, false, json!([row])).await
    }

    async fn clear_row(&self, row: usize) -> Result<()> {
        let cells = format!("A{}:F{}", row, row);
        let url = self.values_url(&format!("{}:clear", self.range(&cells)))?;
        debug!("Sheets CLEAR {}", cells);
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .json(&json!({}))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;

    fn store(sheet_name: &str) -> SheetsStore {
        let config = StoreConfig {
            backend: StoreBackend::Sheets,
            spreadsheet_id: Some("abc".into()),
            sheet_name: sheet_name.into(),
            api_base: "https://sheets.googleapis.com".into(),
            access_token: Some("token".into()),
            timeout_seconds: 5,
        };
        SheetsStore::new(&config, "abc".into(), "token".into()).unwrap()
    }

    #[test]
    fn builds_a1_ranges() {
        assert_eq!(store("Sheet1").range("C:C"), "Sheet1!C:C");
        assert_eq!(store("My Links").range("B4"), "'My Links'!B4");
    }

    #[test]
    fn builds_values_urls() {
        let s = store("Sheet1");
        let url = s.values_url("Sheet1!A:F:append").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/Sheet1!A:F:append"
        );
        let url = s.values_url(&store("My Links").range("C:C")).unwrap();
        assert!(url.as_str().ends_with("/values/'My%20Links'!C:C"));
    }

    #[test]
    fn counts_are_sent_as_numbers() {
        assert_eq!(cell_value(Column::Count, "3".into()), json!(3));
        assert_eq!(cell_value(Column::Url, "3".into()), json!("3"));
        assert_eq!(cell_text(&json!(12)), "12");
        assert_eq!(cell_text(&json!("x")), "x");
    }

    #[test]
    fn cleared_rows_keep_their_position() {
        let rows = decode_values(r#"{"range":"Sheet1!C1:C3","values":[["a"],[],["c"]]}"#).unwrap();
        assert_eq!(codes_from_rows(&rows), vec!["a", "", "c"]);
    }

    #[test]
    fn missing_values_mean_an_empty_range() {
        let rows = decode_values("{}").unwrap();
        assert!(rows.is_empty());
        assert!(codes_from_rows(&rows).is_empty());
        assert_eq!(cell_from_rows(&rows), None);
    }

    #[test]
    fn numeric_cells_read_as_text() {
        let rows = decode_values(r#"{"values":[[3]]}"#).unwrap();
        assert_eq!(cell_from_rows(&rows).as_deref(), Some("3"));

        let rows = decode_values(r#"{"values":[[""]]}"#).unwrap();
        assert_eq!(cell_from_rows(&rows), None);
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        assert!(matches!(
            decode_values("<html>oops</html>"),
            Err(StoreError::Decode(_))
        ));
        assert!(matches!(
            decode_values(r#"{"values":"nope"}"#),
            Err(StoreError::Decode(_))
        ));
    }

    #[test]
    fn error_status_keeps_the_body() {
        match status_error(403, "PERMISSION_DENIED".into()) {
            StoreError::Status { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "PERMISSION_DENIED");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
