//! Resolved schemas for the loan log and the catalog.
//!
//! Headers are matched once per load and the resulting indices are threaded
//! through the status engine, table views and reports.

use serde::{Deserialize, Serialize};

use crate::error::{BookshelfError, Result};
use super::column::ColumnRole;

/// Header label appended when the catalog has no status column.
pub const SYNTHESIZED_STATUS_COLUMN: &str = "대출여부";

/// Header label appended when the catalog has no borrower column.
pub const SYNTHESIZED_BORROWER_COLUMN: &str = "대출자";

/// Column indices of the loan log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanLogSchema {
    pub date: usize,
    pub code: usize,
    pub status: usize,
    pub borrower: usize,
}

impl LoanLogSchema {
    /// Resolve the loan log header. All four columns are required.
    pub fn resolve<S: AsRef<str>>(header: &[S]) -> Result<Self> {
        let require = |role: ColumnRole| {
            role.find(header)
                .ok_or_else(|| BookshelfError::missing_column(role.to_string(), "loan log"))
        };

        Ok(Self {
            date: require(ColumnRole::Date)?,
            code: require(ColumnRole::Code)?,
            status: require(ColumnRole::Status)?,
            borrower: require(ColumnRole::Borrower)?,
        })
    }
}

/// Column indices of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSchema {
    pub code: usize,
    pub status: usize,
    pub borrower: usize,
    pub title: Option<usize>,
    pub author: Option<usize>,
    /// Registration date, needed by the recency filter.
    pub date: Option<usize>,
    pub notes: Option<usize>,
    /// Columns that were appended because the source lacked them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synthesized: Vec<usize>,
}

impl CatalogSchema {
    /// Resolve the catalog header, appending status and borrower columns
    /// when absent.
    ///
    /// Both roles are resolved against the original header before anything is
    /// appended, so a synthesized column never shadows an existing one.
    pub fn resolve(header: &mut Vec<String>) -> Result<Self> {
        let code = ColumnRole::Code
            .find(header)
            .ok_or_else(|| BookshelfError::missing_column("code", "catalog"))?;

        let status = ColumnRole::Status.find(header);
        let borrower = ColumnRole::Borrower.find(header);
        let mut synthesized = Vec::new();

        let status = status.unwrap_or_else(|| {
            header.push(SYNTHESIZED_STATUS_COLUMN.to_string());
            synthesized.push(header.len() - 1);
            header.len() - 1
        });
        let borrower = borrower.unwrap_or_else(|| {
            header.push(SYNTHESIZED_BORROWER_COLUMN.to_string());
            synthesized.push(header.len() - 1);
            header.len() - 1
        });

        Ok(Self {
            code,
            status,
            borrower,
            title: ColumnRole::Title.find(header),
            author: ColumnRole::Author.find(header),
            date: ColumnRole::Date.find(header),
            notes: ColumnRole::Notes.find(header),
            synthesized,
        })
    }

    /// Columns whose long text should wrap when displayed.
    pub fn wrap_columns(&self) -> Vec<usize> {
        self.title.into_iter().chain(self.notes).collect()
    }
}
