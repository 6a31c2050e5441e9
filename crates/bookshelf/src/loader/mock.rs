//! In-memory sheet source for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{BookshelfError, Result};
use crate::input::Sheet;

use super::sheet_api::SheetSource;

/// Sheet source serving fixed sheets, or failing every request.
#[derive(Debug, Default)]
pub struct MockSheetSource {
    sheets: HashMap<String, Sheet>,
    failure: Option<String>,
    requests: AtomicUsize,
}

impl MockSheetSource {
    /// Create an empty source; unknown sheets fail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `sheet` under `name`.
    pub fn with_sheet(mut self, name: impl Into<String>, sheet: Sheet) -> Self {
        self.sheets.insert(name.into(), sheet);
        self
    }

    /// Fail every request with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Number of sheets requested so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl SheetSource for MockSheetSource {
    async fn fetch_sheet(&self, sheet: &str) -> Result<Sheet> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.failure {
            return Err(BookshelfError::SourceUnavailable(message.clone()));
        }
        self.sheets
            .get(sheet)
            .cloned()
            .ok_or_else(|| BookshelfError::SourceUnavailable(format!("No sheet named '{}'", sheet)))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
