//! Compound catalog filters.

use chrono::{Duration, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{BookshelfError, Result};
use crate::status::{parse_date, DerivedCatalog, LibraryEntry};

/// Width of the "registered recently" window.
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// Toggles applied to the canonical catalog.
///
/// Filters always start from the derived catalog, never from the current
/// sorted or searched view, so toggling one off restores what the others
/// allow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogFilter {
    /// Keep only books on loan or overdue.
    pub on_loan_only: bool,
    /// Keep only books registered within the last 30 days.
    pub recent_only: bool,
    /// Reverse source order before filtering.
    pub newest_first: bool,
}

impl CatalogFilter {
    /// Whether any toggle is on.
    pub fn is_active(&self) -> bool {
        self.on_loan_only || self.recent_only || self.newest_first
    }

    /// Apply the filter against the current local time.
    pub fn apply(&self, catalog: &DerivedCatalog) -> Result<Vec<LibraryEntry>> {
        self.apply_at(catalog, Local::now().naive_local())
    }

    /// Apply the filter against an explicit `now`.
    ///
    /// Fails with [`BookshelfError::MissingColumn`] when `recent_only` is set
    /// and the catalog has no date column.
    pub fn apply_at(&self, catalog: &DerivedCatalog, now: NaiveDateTime) -> Result<Vec<LibraryEntry>> {
        let date_column = if self.recent_only {
            Some(catalog.schema.date.ok_or_else(|| {
                BookshelfError::missing_column("registration date", "catalog; cannot filter recent books")
            })?)
        } else {
            None
        };

        let mut rows: Vec<LibraryEntry> = catalog.entries.clone();
        if self.newest_first {
            rows.reverse();
        }

        let status_column = Some(catalog.schema.status);
        let window = Duration::days(RECENT_WINDOW_DAYS);

        Ok(rows
            .into_iter()
            .filter(|entry| !self.on_loan_only || entry.is_on_loan(status_column))
            .filter(|entry| match date_column {
                Some(column) => parse_date(entry.cell(column))
                    .is_some_and(|registered| registered <= now && now - registered <= window),
                None => true,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Sheet;
    use crate::status::derive_loan_state_at;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 30)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn sheet(rows: &[&[&str]]) -> Sheet {
        Sheet::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    fn catalog(with_date: bool) -> DerivedCatalog {
        let log = sheet(&[
            &["대출일", "코드", "대출자", "상태"],
            &["2024-06-25", "B001", "김", "대출"],
            &["2024-05-01", "B002", "이", "대출"],
            &["2024-05-01", "B003", "박", "대출"],
            &["2024-05-03", "B003", "박", "반납"],
        ]);
        let catalog = if with_date {
            sheet(&[
                &["코드", "제목", "등록일"],
                &["B001", "A", "2024-01-01"],
                &["B002", "B", "2024-06-20"],
                &["B003", "C", "2024-06-29"],
                &["B004", "D", "not a date"],
            ])
        } else {
            sheet(&[&["코드", "제목"], &["B001", "A"], &["B002", "B"]])
        };
        derive_loan_state_at(&log, catalog, now()).unwrap()
    }

    fn codes(rows: &[LibraryEntry]) -> Vec<&str> {
        rows.iter().map(|r| r.cell(0)).collect()
    }

    #[test]
    fn test_no_filter_returns_everything() {
        let derived = catalog(true);
        let rows = CatalogFilter::default().apply_at(&derived, now()).unwrap();
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn test_on_loan_only_includes_overdue() {
        let derived = catalog(true);
        let filter = CatalogFilter {
            on_loan_only: true,
            ..Default::default()
        };
        let rows = filter.apply_at(&derived, now()).unwrap();
        assert_eq!(codes(&rows), vec!["B001", "B002"]);
        assert!(rows[1].status.as_ref().unwrap().is_overdue());
    }

    #[test]
    fn test_recent_only() {
        let derived = catalog(true);
        let filter = CatalogFilter {
            recent_only: true,
            ..Default::default()
        };
        let rows = filter.apply_at(&derived, now()).unwrap();
        assert_eq!(codes(&rows), vec!["B002", "B003"]);
    }

    #[test]
    fn test_recent_only_requires_date_column() {
        let derived = catalog(false);
        let filter = CatalogFilter {
            recent_only: true,
            ..Default::default()
        };
        let err = filter.apply_at(&derived, now()).unwrap_err();
        assert!(matches!(err, BookshelfError::MissingColumn { .. }));
    }

    #[test]
    fn test_newest_first_combined() {
        let derived = catalog(true);
        let filter = CatalogFilter {
            newest_first: true,
            recent_only: true,
            ..Default::default()
        };
        let rows = filter.apply_at(&derived, now()).unwrap();
        assert_eq!(codes(&rows), vec!["B003", "B002"]);
    }
}
