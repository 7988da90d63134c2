use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Column, RecordStore, Result};
use crate::{errors::StoreError, models::ShortLinkRecord};

type Row = [String; 6];

/// Process-local table with the same positional semantics as the spreadsheet.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<Row>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(rows: &[Row], row: usize) -> Option<&Row> {
        row.checked_sub(1).and_then(|idx| rows.get(idx))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_codes(&self) -> Result<Vec<String>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .map(|r| r[Column::ShortCode.index()].clone())
            .collect())
    }

    async fn read_cell(&self, row: usize, column: Column) -> Result<Option<String>> {
        let rows = self.rows.read().await;
        Ok(Self::slot(&rows, row)
            .map(|r| r[column.index()].clone())
            .filter(|v| !v.is_empty()))
    }

    async fn write_cell(&self, row: usize, column: Column, value: String) -> Result<()> {
        if row == 0 {
            return Err(StoreError::Decode("rows are 1-based".to_string()));
        }
        let mut rows = self.rows.write().await;
        // Writing below the table grows it, as a spreadsheet would
        if rows.len() < row {
            rows.resize_with(row, Row::default);
        }
        rows[row - 1][column.index()] = value;
        Ok(())
    }

    async fn append_row(&self, record: &ShortLinkRecord) -> Result<()> {
        let cells = record.to_row();
        let mut row = Row::default();
        for (slot, value) in row.iter_mut().zip(cells) {
            *slot = value;
        }
        self.rows.write().await.push(row);
        Ok(())
    }

    async fn clear_row(&self, row: usize) -> Result<()> {
        let mut rows = self.rows.write().await;
        if let Some(r) = row.checked_sub(1).and_then(|idx| rows.get_mut(idx)) {
            *r = Row::default();
        }
        Ok(())
    }
}
