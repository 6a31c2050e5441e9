//! Cell comparison for column sorting.

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d.\-]").unwrap());
static LEADING_FLOAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(?:\d+(?:\.\d*)?|\.\d+)").unwrap());

/// Direction of a column sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// The opposite direction.
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    /// Apply this direction to an ascending ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Numeric value of a cell after dropping everything but digits, `.` and `-`.
///
/// Only the leading number is read, so `"1.2.3"` is `1.2` and `"-"` is not a
/// number.
pub fn parse_numeric(cell: &str) -> Option<f64> {
    let stripped = NON_NUMERIC.replace_all(cell, "");
    LEADING_FLOAT
        .find(&stripped)
        .and_then(|m| m.as_str().parse().ok())
}

/// Compare two cells: numerically when both parse as numbers, otherwise
/// with [`natural_cmp`].
///
/// Numeric cells sort before text cells. Comparing a mixed pair as text
/// instead is not transitive (`"Catch-22"` reads as -22, below `"-5"`, yet
/// `"-5" < "Animal Farm" < "Catch-22"` as text) and `sort_by` needs a
/// total order.
pub fn compare_cells(a: &str, b: &str) -> Ordering {
    match (parse_numeric(a), parse_numeric(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => natural_cmp(a, b),
    }
}

/// Case-insensitive string comparison that orders embedded digit runs by
/// their numeric value (`"Vol 2"` before `"Vol 10"`).
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a).into_iter();
    let mut right = chunks(b).into_iter();

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = compare_chunk(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

/// Split into maximal runs of ASCII digits and non-digits.
fn chunks(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev_digit = None;

    for (i, c) in text.char_indices() {
        let digit = c.is_ascii_digit();
        if prev_digit.is_some_and(|p| p != digit) {
            out.push(&text[start..i]);
            start = i;
        }
        prev_digit = Some(digit);
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

fn compare_chunk(a: &str, b: &str) -> Ordering {
    let a_digits = a.bytes().all(|c| c.is_ascii_digit());
    let b_digits = b.bytes().all(|c| c.is_ascii_digit());

    match (a_digits, b_digits) {
        (true, true) => {
            let a_trim = a.trim_start_matches('0');
            let b_trim = b.trim_start_matches('0');
            a_trim
                .len()
                .cmp(&b_trim.len())
                .then_with(|| a_trim.cmp(b_trim))
        }
        // Digits sort before letters.
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}
