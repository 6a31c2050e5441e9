//! Loan status classification.
//!
//! A loan is due [`LOAN_PERIOD_DAYS`] days after its loan date. Classification
//! is total: every (date, status) pair yields a [`LoanStatus`], unparseable
//! dates included.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Fixed loan period.
pub const LOAN_PERIOD_DAYS: i64 = 14;

const SECONDS_PER_DAY: i64 = 86_400;

/// Status words that mark a loan as returned.
const RETURNED_WORDS: &[&str] = &["반납", "returned"];

/// Status words that mark a loan as overdue.
const OVERDUE_WORDS: &[&str] = &["연체", "overdue"];

/// Status words that mark a book as out on loan.
const ON_LOAN_WORDS: &[&str] = &["대출", "대여", "on loan", "borrowed"];

static YMD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})\s*[-/.]\s*(\d{1,2})\s*[-/.]\s*(\d{1,2})\.?(?:(?:\s+|T)(.+))?$").unwrap()
});

static MDY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})(?:\s+(.+))?$").unwrap());

static TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(오전|오후|am|pm)?\s*(\d{1,2}):(\d{2})(?::(\d{2})(?:\.\d+)?)?\s*(am|pm)?$")
        .unwrap()
});

/// Structured outcome of classifying a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoanState {
    /// The book is back on the shelf.
    Returned,
    /// The loan date could not be parsed.
    Unknown,
    /// On loan and not yet due; `days_remaining` is 0 on the due date.
    OnLoan { days_remaining: i64 },
    /// Past the loan period.
    Overdue { days_overdue: i64 },
}

/// A classification plus the text shown in the status column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanStatus {
    pub state: LoanState,
    pub display: String,
}

impl LoanStatus {
    /// Whether the book is currently out (on loan or overdue).
    pub fn is_out(&self) -> bool {
        matches!(self.state, LoanState::OnLoan { .. } | LoanState::Overdue { .. })
    }

    /// Whether the book is overdue.
    pub fn is_overdue(&self) -> bool {
        matches!(self.state, LoanState::Overdue { .. })
    }
}

/// Visual treatment of a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStyle {
    #[default]
    Plain,
    Borrowed,
    Overdue,
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    let lower = text.to_lowercase();
    words.iter().any(|w| lower.contains(w))
}

/// Whether a status string reports a return.
pub fn is_returned(status: &str) -> bool {
    contains_any(status, RETURNED_WORDS)
}

/// Row style from the structured classification, falling back to the raw
/// status text when no classification is attached.
pub fn row_style(status: Option<&LoanStatus>, raw: &str) -> RowStyle {
    match status.map(|s| s.state) {
        Some(LoanState::Overdue { .. }) => RowStyle::Overdue,
        Some(LoanState::OnLoan { .. }) => RowStyle::Borrowed,
        Some(LoanState::Returned) => RowStyle::Plain,
        // Unknown dates say nothing about the loan; use the text.
        Some(LoanState::Unknown) | None if is_returned(raw) => RowStyle::Plain,
        Some(LoanState::Unknown) | None if contains_any(raw, OVERDUE_WORDS) => RowStyle::Overdue,
        Some(LoanState::Unknown) | None if contains_any(raw, ON_LOAN_WORDS) => RowStyle::Borrowed,
        Some(LoanState::Unknown) | None => RowStyle::Plain,
    }
}

/// Whether a row counts as "on loan" for filtering and reporting.
pub fn is_on_loan(status: Option<&LoanStatus>, raw: &str) -> bool {
    match status.map(|s| s.state) {
        Some(LoanState::OnLoan { .. } | LoanState::Overdue { .. }) => true,
        Some(LoanState::Returned) => false,
        Some(LoanState::Unknown) | None => {
            !is_returned(raw) && (contains_any(raw, ON_LOAN_WORDS) || contains_any(raw, OVERDUE_WORDS))
        }
    }
}

/// Parse a loan or registration date.
///
/// Accepts RFC 3339 and `Y-M-D` / `Y/M/D` / `Y.M.D` / `M/D/Y` dates, each with
/// an optional `H:M[:S]` time (12-hour markers `AM`/`PM`/`오전`/`오후`
/// included). Date-only values resolve to midnight.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    let (year, month, day, rest): (i32, u32, u32, Option<&str>) = if let Some(caps) = YMD.captures(text) {
        (
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
            caps.get(4).map(|m| m.as_str()),
        )
    } else if let Some(caps) = MDY.captures(text) {
        (
            caps[3].parse().ok()?,
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps.get(4).map(|m| m.as_str()),
        )
    } else {
        return None;
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = match rest {
        Some(rest) => parse_time(rest)?,
        None => NaiveTime::MIN,
    };
    Some(date.and_time(time))
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let caps = TIME.captures(text.trim())?;
    let mut hour: u32 = caps[2].parse().ok()?;
    let minute: u32 = caps[3].parse().ok()?;
    let second: u32 = caps.get(4).map_or(Ok(0), |m| m.as_str().parse::<u32>()).ok()?;

    let marker = caps
        .get(1)
        .or_else(|| caps.get(5))
        .map(|m| m.as_str().to_lowercase());
    match marker.as_deref() {
        Some("오후" | "pm") if hour < 12 => hour += 12,
        Some("오전" | "am") if hour == 12 => hour = 0,
        _ => {}
    }

    NaiveTime::from_hms_opt(hour, minute, second)
}

/// Classify a loan against the current local time.
pub fn classify(loan_date: &str, raw_status: &str) -> LoanStatus {
    classify_at(loan_date, raw_status, Local::now().naive_local())
}

/// Classify a loan against an explicit `now`.
pub fn classify_at(loan_date: &str, raw_status: &str, now: NaiveDateTime) -> LoanStatus {
    if is_returned(raw_status) {
        return LoanStatus {
            state: LoanState::Returned,
            display: raw_status.to_string(),
        };
    }

    let Some(loaned_at) = parse_date(loan_date) else {
        return LoanStatus {
            state: LoanState::Unknown,
            display: raw_status.to_string(),
        };
    };

    let days_elapsed = (now - loaned_at).num_seconds().div_euclid(SECONDS_PER_DAY);
    let remaining = LOAN_PERIOD_DAYS - days_elapsed;

    if remaining > 0 {
        LoanStatus {
            state: LoanState::OnLoan {
                days_remaining: remaining,
            },
            display: format!("on loan ({} days left)", remaining),
        }
    } else if remaining == 0 {
        LoanStatus {
            state: LoanState::OnLoan { days_remaining: 0 },
            display: "on loan (due today)".to_string(),
        }
    } else {
        let days_overdue = remaining.abs();
        LoanStatus {
            state: LoanState::Overdue { days_overdue },
            display: format!("overdue ({} days)", days_overdue),
        }
    }
}
