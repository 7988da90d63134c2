//! Record store: a flat, position-addressed table of short link rows.
//!
//! The store has no index. Every lookup scans the short code column and
//! addresses the remaining columns by the row position found there, so the
//! cost of each operation is O(rows).

use std::sync::Arc;

use async_trait::async_trait;
use log::info;

use crate::{
    config::{StoreBackend, StoreConfig},
    errors::{AppError, ConfigError, StoreError},
    models::ShortLinkRecord,
};

mod memory;
mod sheets;

pub use memory::MemoryStore;
pub use sheets::SheetsStore;

type Result<T> = std::result::Result<T, StoreError>;

/// Column layout of a short link row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Url,
    ShortCode,
    CreatedAt,
    UpdatedAt,
    Count,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Id,
        Column::Url,
        Column::ShortCode,
        Column::CreatedAt,
        Column::UpdatedAt,
        Column::Count,
    ];

    /// A1 column letter
    pub fn letter(self) -> char {
        match self {
            Column::Id => 'A',
            Column::Url => 'B',
            Column::ShortCode => 'C',
            Column::CreatedAt => 'D',
            Column::UpdatedAt => 'E',
            Column::Count => 'F',
        }
    }

    pub fn index(self) -> usize {
        (self.letter() as u8 - b'A') as usize
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every cell of the short code column in row order.
    ///
    /// Cleared cells are returned as empty strings so that
    /// `position + 1` is always the row number.
    async fn list_codes(&self) -> Result<Vec<String>>;

    /// Reads one cell. `row` is 1-based. Blank cells are `None`.
    async fn read_cell(&self, row: usize, column: Column) -> Result<Option<String>>;

    /// Overwrites one cell. `row` is 1-based.
    async fn write_cell(&self, row: usize, column: Column, value: String) -> Result<()>;

    /// Appends a row past the last used row. Cleared rows are not reused.
    async fn append_row(&self, record: &ShortLinkRecord) -> Result<()>;

    /// Blanks every column of `row`. The row keeps its position.
    async fn clear_row(&self, row: usize) -> Result<()>;
}

/// Scans the short code column for `code` and returns its 1-based row.
pub async fn find_row(store: &dyn RecordStore, code: &str) -> Result<Option<usize>> {
    if code.is_empty() {
        return Ok(None);
    }
    let codes = store.list_codes().await?;
    Ok(codes.iter().position(|c| c == code).map(|idx| idx + 1))
}

/// Builds the store selected by configuration.
pub fn from_config(config: &StoreConfig) -> std::result::Result<Arc<dyn RecordStore>, AppError> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory record store, data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Sheets => {
            let spreadsheet_id = config
                .spreadsheet_id
                .clone()
                .ok_or_else(|| ConfigError::Missing("SPREADSHEET_ID".to_string()))?;
            let access_token = config
                .access_token
                .clone()
                .ok_or_else(|| ConfigError::Missing("GOOGLE_ACCESS_TOKEN".to_string()))?;
            info!(
                "Using spreadsheet record store {} ({})",
                spreadsheet_id, config.sheet_name
            );
            let store = SheetsStore::new(config, spreadsheet_id, access_token)?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_map_to_letters() {
        let letters: String = Column::ALL.iter().map(|c| c.letter()).collect();
        assert_eq!(letters, "ABCDEF");
        assert_eq!(Column::Count.index(), 5);
    }

    #[tokio::test]
    async fn find_row_is_one_based_and_skips_blanks() {
        let store = MemoryStore::new();
        for code in ["a", "b", "c"] {
            store
                .append_row(&ShortLinkRecord::new("https://x.com".into(), code.into()))
                .await
                .unwrap();
        }
        store.clear_row(2).await.unwrap();

        assert_eq!(find_row(&store, "a").await.unwrap(), Some(1));
        assert_eq!(find_row(&store, "b").await.unwrap(), None);
        assert_eq!(find_row(&store, "c").await.unwrap(), Some(3));
        assert_eq!(find_row(&store, "").await.unwrap(), None);
    }

    #[test]
    fn sheets_backend_requires_credentials() {
        let config = StoreConfig {
            backend: StoreBackend::Sheets,
            spreadsheet_id: Some("sheet".into()),
            sheet_name: "Sheet1".into(),
            api_base: "https://sheets.googleapis.com".into(),
            access_token: None,
            timeout_seconds: 5,
        };
        assert!(matches!(from_config(&config), Err(AppError::Config(_))));
    }
}
