//! Loan status engine.
//!
//! The loan log is reduced to one [`LoanRecord`] per book code (last row
//! wins), and every catalog entry is classified from its record as returned,
//! on loan with days remaining, or overdue.

mod classify;
mod engine;
mod history;

pub use classify::{
    classify, classify_at, is_on_loan, is_returned, parse_date, row_style, LoanState, LoanStatus,
    RowStyle, LOAN_PERIOD_DAYS,
};
pub use engine::{
    collect_loan_records, derive_loan_state, derive_loan_state_at, DerivedCatalog, LibraryEntry,
    LoanRecord, LoanSnapshot, RETURNED_LABEL,
};
pub use history::{loan_history, loan_history_at, HistoryEntry};
