//! Per-book loan history.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::input::Sheet;
use crate::schema::{normalize, LoanLogSchema};

use super::classify::{classify_at, LoanStatus};

/// One loan-log row for a book, classified on its own date and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: String,
    pub borrower: String,
    pub status: LoanStatus,
}

/// All loan-log rows for `code`, in log order.
pub fn loan_history(log: &Sheet, code: &str) -> Result<Vec<HistoryEntry>> {
    loan_history_at(log, code, Local::now().naive_local())
}

/// [`loan_history`] against an explicit `now`.
pub fn loan_history_at(log: &Sheet, code: &str, now: NaiveDateTime) -> Result<Vec<HistoryEntry>> {
    let schema = LoanLogSchema::resolve(&log.header)?;
    let code = normalize(code);

    Ok(log
        .rows
        .iter()
        .filter(|row| row.get(schema.code).is_some_and(|c| normalize(c) == code))
        .map(|row| {
            let cell = |i: usize| normalize(row.get(i).map(|s| s.as_str()).unwrap_or(""));
            let date = cell(schema.date);
            let status = classify_at(&date, &cell(schema.status), now);
            HistoryEntry {
                date,
                borrower: cell(schema.borrower),
                status,
            }
        })
        .collect())
}
