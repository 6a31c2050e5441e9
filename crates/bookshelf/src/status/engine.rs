//! Derivation of current loan state from the loan log.

use chrono::{Local, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::input::Sheet;
use crate::schema::{normalize, CatalogSchema, LoanLogSchema};

use super::classify::{classify_at, is_on_loan, is_returned, row_style, LoanState, LoanStatus, RowStyle};

/// Status text written for books whose last log entry is a return.
pub const RETURNED_LABEL: &str = "returned";

/// Latest known state of one book code, accumulated from the loan log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    /// Status of the last log row for the code.
    pub status: String,
    /// Borrower of the last log row for the code.
    pub borrower: String,
    /// Date of the last row reporting a return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_return: Option<String>,
    /// Date of the last row that is not a return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_date: Option<String>,
}

/// Inputs a classification was computed from, kept so it can be refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanSnapshot {
    pub loan_date: String,
    pub raw_status: String,
}

/// One displayed row: its cells plus an optional loan classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub cells: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LoanStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan: Option<LoanSnapshot>,
}

impl LibraryEntry {
    /// A row with no classification attached.
    pub fn plain(cells: Vec<String>) -> Self {
        Self {
            cells,
            status: None,
            loan: None,
        }
    }

    /// Cell text, or `""` when the index is out of range.
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(|s| s.as_str()).unwrap_or("")
    }

    /// Recompute the classification from the stored snapshot.
    ///
    /// Returns the new status text when the entry carries a snapshot.
    pub fn refresh_status_at(&mut self, now: NaiveDateTime) -> Option<&str> {
        let loan = self.loan.as_ref()?;
        let status = classify_at(&loan.loan_date, &loan.raw_status, now);
        self.status = Some(status);
        self.status.as_ref().map(|s| s.display.as_str())
    }

    /// Row style for display.
    pub fn style(&self, status_column: Option<usize>) -> RowStyle {
        let raw = status_column.map(|i| self.cell(i)).unwrap_or("");
        row_style(self.status.as_ref(), raw)
    }

    /// Whether the entry counts as on loan.
    pub fn is_on_loan(&self, status_column: Option<usize>) -> bool {
        let raw = status_column.map(|i| self.cell(i)).unwrap_or("");
        is_on_loan(self.status.as_ref(), raw)
    }

    fn set(&mut self, index: usize, value: impl Into<String>) {
        if self.cells.len() <= index {
            self.cells.resize(index + 1, String::new());
        }
        self.cells[index] = value.into();
    }
}

/// The catalog after loan state has been derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedCatalog {
    /// Catalog header, including synthesized columns.
    pub header: Vec<String>,
    pub schema: CatalogSchema,
    pub entries: Vec<LibraryEntry>,
    /// Loan records keyed by code, in first-seen order.
    pub records: IndexMap<String, LoanRecord>,
}

impl DerivedCatalog {
    /// Entries currently out on loan.
    pub fn on_loan(&self) -> impl Iterator<Item = &LibraryEntry> {
        let status = Some(self.schema.status);
        self.entries.iter().filter(move |e| e.is_on_loan(status))
    }

    /// Find an entry by its book code.
    pub fn find(&self, code: &str) -> Option<&LibraryEntry> {
        let code = normalize(code);
        self.entries
            .iter()
            .find(|e| normalize(e.cell(self.schema.code)) == code)
    }

    /// Refresh every classification against `now`, rewriting status cells.
    pub fn refresh_at(&mut self, now: NaiveDateTime) {
        let column = self.schema.status;
        for entry in &mut self.entries {
            if let Some(display) = entry.refresh_status_at(now).map(str::to_string) {
                entry.set(column, display);
            }
        }
    }
}

/// Scan the loan log top to bottom, keeping the last row per code.
///
/// Row order is authoritative: dates are never compared, so the log must be
/// stored chronologically for the result to reflect the latest loan.
pub fn collect_loan_records(log: &Sheet, schema: &LoanLogSchema) -> IndexMap<String, LoanRecord> {
    let mut records: IndexMap<String, LoanRecord> = IndexMap::new();

    for row in &log.rows {
        let cell = |i: usize| normalize(row.get(i).map(|s| s.as_str()).unwrap_or(""));
        let code = cell(schema.code);
        if code.is_empty() {
            continue;
        }

        let date = cell(schema.date);
        let status = cell(schema.status);
        let record = records.entry(code).or_default();

        if is_returned(&status) {
            record.last_return = Some(date);
        } else {
            record.loan_date = Some(date);
        }
        record.status = status;
        record.borrower = cell(schema.borrower);
    }

    records
}

/// Derive the current loan state of every catalog entry.
pub fn derive_loan_state(loan_log: &Sheet, catalog: Sheet) -> Result<DerivedCatalog> {
    derive_loan_state_at(loan_log, catalog, Local::now().naive_local())
}

/// Derive loan state against an explicit `now`.
pub fn derive_loan_state_at(
    loan_log: &Sheet,
    catalog: Sheet,
    now: NaiveDateTime,
) -> Result<DerivedCatalog> {
    let log_schema = LoanLogSchema::resolve(&loan_log.header)?;
    let records = collect_loan_records(loan_log, &log_schema);

    let Sheet { mut header, rows } = catalog;
    let schema = CatalogSchema::resolve(&mut header)?;
    let width = header.len();

    let entries: Vec<LibraryEntry> = rows
        .into_iter()
        .map(|mut cells| {
            if cells.len() < width {
                cells.resize(width, String::new());
            }
            let mut entry = LibraryEntry::plain(cells);
            apply_record(&mut entry, &schema, &records, now);
            entry
        })
        .collect();

    debug!(
        records = records.len(),
        entries = entries.len(),
        synthesized = schema.synthesized.len(),
        "Derived loan state"
    );

    Ok(DerivedCatalog {
        header,
        schema,
        entries,
        records,
    })
}

fn apply_record(
    entry: &mut LibraryEntry,
    schema: &CatalogSchema,
    records: &IndexMap<String, LoanRecord>,
    now: NaiveDateTime,
) {
    let code = normalize(entry.cell(schema.code));
    let Some(record) = records.get(&code) else {
        entry.set(schema.status, "");
        entry.set(schema.borrower, "");
        return;
    };

    if is_returned(&record.status) {
        entry.set(schema.status, RETURNED_LABEL);
        entry.set(schema.borrower, "");
        entry.status = Some(LoanStatus {
            state: LoanState::Returned,
            display: RETURNED_LABEL.to_string(),
        });
        return;
    }

    let snapshot = LoanSnapshot {
        loan_date: record.loan_date.clone().unwrap_or_default(),
        raw_status: record.status.clone(),
    };
    let status = classify_at(&snapshot.loan_date, &snapshot.raw_status, now);

    entry.set(schema.borrower, record.borrower.clone());
    entry.set(schema.status, status.display.clone());
    entry.status = Some(status);
    entry.loan = Some(snapshot);
}
