//! CSV parser for loan logs and catalogs.

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{BookshelfError, Result};
use super::source::{Sheet, SourceKind, SourceMetadata};

/// Byte-order mark some spreadsheet exports prepend.
const BOM: &str = "\u{feff}";

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Field delimiter.
    pub delimiter: u8,
    /// Quote character.
    pub quote: u8,
    /// Maximum rows to read (None = all).
    pub max_rows: Option<usize>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            max_rows: None,
        }
    }
}

/// Parses CSV exports of the loan log and catalog.
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a file and return the sheet and its metadata.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(Sheet, SourceMetadata)> {
        let path = path.as_ref();
        let contents = fs::read(path).map_err(|e| BookshelfError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.parse_named(&name, &contents)
    }

    /// Parse raw bytes that were read from `name`.
    pub fn parse_named(&self, name: &str, contents: &[u8]) -> Result<(Sheet, SourceMetadata)> {
        let sheet = self.parse_bytes(contents)?;
        let metadata = SourceMetadata::new(name, SourceKind::Csv, content_hash(contents), &sheet);
        Ok((sheet, metadata))
    }

    /// Parse bytes directly.
    ///
    /// The text is trimmed and a leading BOM removed before parsing; blank
    /// lines are skipped and ragged rows are padded to the header width.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Sheet> {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim().trim_start_matches(BOM);

        if text.is_empty() {
            return Err(BookshelfError::EmptyData("No lines to parse".to_string()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.config.delimiter)
            .quote(self.config.quote)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            if record.iter().all(|cell| cell.is_empty()) && record.len() <= 1 {
                continue;
            }
            rows.push(record.iter().map(|s| s.to_string()).collect::<Vec<_>>());

            // +1 for the header row
            if let Some(max) = self.config.max_rows {
                if rows.len() > max {
                    break;
                }
            }
        }

        let mut sheet = Sheet::from_rows(rows)?;
        let width = sheet.column_count();
        for row in &mut sheet.rows {
            row.truncate(width);
        }
        Ok(sheet)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 of raw contents, prefixed with the algorithm name.
pub fn content_hash(contents: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    format!("sha256:{:x}", hasher.finalize())
}
