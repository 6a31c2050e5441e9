//! Loading the loan log and catalog together, with CSV fallback.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{BookshelfError, Result};
use crate::input::{content_hash, Parser, Sheet, SourceKind, SourceMetadata};

use super::sheet_api::{SheetApiClient, SheetSource};

/// CSV file holding the loan log.
pub const LOAN_LOG_FILE: &str = "books.csv";

/// CSV file holding the catalog.
pub const CATALOG_FILE: &str = "library.csv";

/// Default sheet name of the loan log.
pub const DEFAULT_LOAN_SHEET: &str = "Books";

/// Default sheet name of the catalog.
pub const DEFAULT_CATALOG_SHEET: &str = "Library";

/// Both sheets of one load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedData {
    /// Where the rows came from.
    pub source: SourceKind,
    pub loan_log: Sheet,
    pub catalog: Sheet,
    /// Metadata for the loan log and catalog, in that order.
    pub metadata: Vec<SourceMetadata>,
    /// Why the sheet API was not used, when the load fell back to CSV.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_error: Option<String>,
}

/// Loads both sheets from the sheet API when configured, else from CSV.
pub struct DataLoader<S = SheetApiClient> {
    source: Option<S>,
    parser: Parser,
    data_dir: PathBuf,
    loan_sheet: String,
    catalog_sheet: String,
}

impl DataLoader<SheetApiClient> {
    /// Create a CSV-only loader reading from `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: None,
            parser: Parser::new(),
            data_dir: data_dir.into(),
            loan_sheet: DEFAULT_LOAN_SHEET.to_string(),
            catalog_sheet: DEFAULT_CATALOG_SHEET.to_string(),
        }
    }
}

impl<S: SheetSource> DataLoader<S> {
    /// Use `source` before falling back to CSV.
    pub fn with_source<T: SheetSource>(self, source: T) -> DataLoader<T> {
        DataLoader {
            source: Some(source),
            parser: self.parser,
            data_dir: self.data_dir,
            loan_sheet: self.loan_sheet,
            catalog_sheet: self.catalog_sheet,
        }
    }

    /// Set the sheet names requested from the source.
    pub fn with_sheet_names(mut self, loan_sheet: impl Into<String>, catalog_sheet: impl Into<String>) -> Self {
        self.loan_sheet = loan_sheet.into();
        self.catalog_sheet = catalog_sheet.into();
        self
    }

    /// Use a custom CSV parser.
    pub fn with_parser(mut self, parser: Parser) -> Self {
        self.parser = parser;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load both sheets.
    ///
    /// Both sheets must resolve before either is returned. When the sheet
    /// source fails for either one, both are read from CSV instead and the
    /// failure is kept in [`LoadedData::fallback_error`].
    pub async fn load(&self) -> Result<LoadedData> {
        let mut fallback_error = None;

        if let Some(source) = &self.source {
            let fetched = tokio::try_join!(
                source.fetch_sheet(&self.loan_sheet),
                source.fetch_sheet(&self.catalog_sheet)
            );

            match fetched {
                Ok((loan_log, catalog)) => {
                    let metadata = vec![
                        sheet_metadata(&self.loan_sheet, &loan_log),
                        sheet_metadata(&self.catalog_sheet, &catalog),
                    ];
                    info!(
                        source = source.name(),
                        loans = loan_log.row_count(),
                        books = catalog.row_count(),
                        "Loaded sheets"
                    );
                    return Ok(LoadedData {
                        source: SourceKind::SheetApi,
                        loan_log,
                        catalog,
                        metadata,
                        fallback_error: None,
                    });
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Sheet source failed, falling back to CSV");
                    fallback_error = Some(e.to_string());
                }
            }
        }

        let csv = tokio::try_join!(self.read_csv(LOAN_LOG_FILE), self.read_csv(CATALOG_FILE));
        let ((loan_log, loan_meta), (catalog, catalog_meta)) = csv.map_err(|e| match &fallback_error {
            Some(api) => BookshelfError::SourceUnavailable(format!(
                "sheet source failed ({}) and CSV fallback failed ({})",
                api, e
            )),
            None => BookshelfError::SourceUnavailable(e.to_string()),
        })?;

        info!(
            dir = %self.data_dir.display(),
            loans = loan_log.row_count(),
            books = catalog.row_count(),
            "Loaded CSV files"
        );

        Ok(LoadedData {
            source: SourceKind::Csv,
            loan_log,
            catalog,
            metadata: vec![loan_meta, catalog_meta],
            fallback_error,
        })
    }

    async fn read_csv(&self, file: &str) -> Result<(Sheet, SourceMetadata)> {
        let path = self.data_dir.join(file);
        let contents = tokio::fs::read(&path).await.map_err(|e| BookshelfError::Io {
            path: path.clone(),
            source: e,
        })?;
        self.parser.parse_named(file, &contents)
    }
}

fn sheet_metadata(name: &str, sheet: &Sheet) -> SourceMetadata {
    let mut raw = Vec::new();
    for row in std::iter::once(&sheet.header).chain(sheet.rows.iter()) {
        raw.extend_from_slice(row.join("\u{1f}").as_bytes());
        raw.push(b'\n');
    }
    SourceMetadata::new(name, SourceKind::SheetApi, content_hash(&raw), sheet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_csv_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = DataLoader::new(dir.path()).load().await.unwrap_err();
        assert!(matches!(err, BookshelfError::SourceUnavailable(_)));
    }

    #[test]
    fn test_sheet_metadata_hash_is_stable() {
        let sheet = Sheet::new(vec!["코드".into()], vec![vec!["B001".into()]]);
        let a = sheet_metadata("Library", &sheet);
        let b = sheet_metadata("Library", &sheet);
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.kind, SourceKind::SheetApi);
        assert_eq!(a.row_count, 1);
    }
}
