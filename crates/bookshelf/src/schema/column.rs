//! Header normalization and fuzzy column lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Remove byte-order marks and surrounding whitespace from a cell.
pub fn normalize(cell: &str) -> String {
    cell.replace('\u{feff}', "").trim().to_string()
}

/// Normalize a header cell for matching: [`normalize`], drop all
/// whitespace, lower-case.
pub fn normalize_header(cell: &str) -> String {
    normalize(cell)
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether the normalized header contains any of the candidates.
pub fn includes_any(header: &str, candidates: &[&str]) -> bool {
    let normalized = normalize_header(header);
    candidates.iter().any(|c| normalized.contains(c))
}

/// Index of the first header cell matching any candidate.
///
/// Header cells are scanned left to right and the first cell containing any
/// candidate wins, regardless of the candidate's rank.
pub fn find_column<S: AsRef<str>>(header: &[S], candidates: &[&str]) -> Option<usize> {
    header.iter().position(|h| includes_any(h.as_ref(), candidates))
}

/// Logical fields resolved from sheet headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Book code, the join key between loan log and catalog.
    Code,
    Title,
    Author,
    /// Loan status text.
    Status,
    /// Current or last borrower.
    Borrower,
    /// Loan date in the log, registration date in the catalog.
    Date,
    /// Free-form remarks.
    Notes,
}

impl ColumnRole {
    /// Ranked candidate substrings, already in normalized (lower-case,
    /// whitespace-free) form.
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            ColumnRole::Code => &["코드", "코드번호", "code"],
            ColumnRole::Title => &["제목", "도서명", "title"],
            ColumnRole::Author => &["지은이", "저자", "author"],
            ColumnRole::Status => &["상태", "대출여부", "status"],
            ColumnRole::Borrower => &["대여자", "대출자", "borrower", "renter"],
            ColumnRole::Date => &["등록일", "대출일", "일자", "date"],
            ColumnRole::Notes => &["기타", "비고", "notes", "memo"],
        }
    }

    /// Resolve this role against a header.
    pub fn find<S: AsRef<str>>(self, header: &[S]) -> Option<usize> {
        find_column(header, self.candidates())
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnRole::Code => "code",
            ColumnRole::Title => "title",
            ColumnRole::Author => "author",
            ColumnRole::Status => "status",
            ColumnRole::Borrower => "borrower",
            ColumnRole::Date => "date",
            ColumnRole::Notes => "notes",
        };
        write!(f, "{}", name)
    }
}
