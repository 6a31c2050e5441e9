//! Sheet representation and source metadata.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BookshelfError, Result};
use crate::schema::normalize;

/// Where a sheet was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Local CSV file.
    Csv,
    /// Spreadsheet-backed HTTP API.
    SheetApi,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Csv => write!(f, "csv"),
            SourceKind::SheetApi => write!(f, "sheet-api"),
        }
    }
}

/// Metadata about a loaded sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name or sheet name.
    pub name: String,
    /// Where the rows came from.
    pub kind: SourceKind,
    /// SHA-256 hash of the raw contents.
    pub hash: String,
    /// Number of data rows (excluding header).
    pub row_count: usize,
    /// Number of columns.
    pub column_count: usize,
    /// When the sheet was loaded.
    pub loaded_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Create metadata for a sheet that has just been loaded.
    pub fn new(name: impl Into<String>, kind: SourceKind, hash: String, sheet: &Sheet) -> Self {
        Self {
            name: name.into(),
            kind,
            hash,
            row_count: sheet.row_count(),
            column_count: sheet.column_count(),
            loaded_at: Utc::now(),
        }
    }
}

/// A header row plus data rows, all cells as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    /// Column headers, trimmed.
    pub header: Vec<String>,
    /// Data rows in source order.
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Create a sheet from a header and rows.
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// Build a sheet from raw rows whose first row is the header.
    ///
    /// Header cells are normalized (BOM removed, trimmed). Data rows are kept
    /// as-is apart from padding short rows to the header width.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Result<Self> {
        let mut rows = rows.into_iter();
        let header: Vec<String> = rows
            .next()
            .ok_or_else(|| BookshelfError::EmptyData("Sheet has no header row".to_string()))?
            .iter()
            .map(|h| normalize(h))
            .collect();

        if header.iter().all(|h| h.is_empty()) {
            return Err(BookshelfError::EmptyData("Header row is blank".to_string()));
        }

        let width = header.len();
        let rows = rows
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, String::new());
                }
                row
            })
            .collect();

        Ok(Self { header, rows })
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    /// Get the number of rows (excluding header).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get a specific cell value.
    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col).map(|s| s.as_str()))
    }
}
