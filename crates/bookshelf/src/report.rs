//! Status summary and the markdown report published to the wiki.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::status::{DerivedCatalog, LibraryEntry, RowStyle};

/// A book that is on loan or overdue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreturnedBook {
    pub code: String,
    pub title: String,
    pub author: String,
    pub borrower: String,
    /// Status cell text, e.g. `overdue (3 days)`.
    pub status: String,
    pub overdue: bool,
}

/// Headline numbers of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total: usize,
    pub unreturned: Vec<UnreturnedBook>,
    /// Percentage of books not out on loan. 100 for an empty catalog.
    pub return_rate: f64,
}

impl StatusSummary {
    /// Summarize a derived catalog.
    pub fn from_catalog(catalog: &DerivedCatalog) -> Self {
        let schema = &catalog.schema;
        let optional = |entry: &LibraryEntry, column: Option<usize>| {
            column.map(|c| entry.cell(c).to_string()).unwrap_or_default()
        };

        let unreturned: Vec<UnreturnedBook> = catalog
            .on_loan()
            .map(|entry| UnreturnedBook {
                code: entry.cell(schema.code).to_string(),
                title: optional(entry, schema.title),
                author: optional(entry, schema.author),
                borrower: entry.cell(schema.borrower).to_string(),
                status: entry.cell(schema.status).to_string(),
                overdue: entry.style(Some(schema.status)) == RowStyle::Overdue,
            })
            .collect();

        let total = catalog.entries.len();
        let return_rate = if total == 0 {
            100.0
        } else {
            (total - unreturned.len()) as f64 / total as f64 * 100.0
        };

        Self {
            total,
            unreturned,
            return_rate,
        }
    }

    pub fn unreturned_count(&self) -> usize {
        self.unreturned.len()
    }

    pub fn overdue_count(&self) -> usize {
        self.unreturned.iter().filter(|b| b.overdue).count()
    }

    /// Render the wiki report.
    pub fn to_markdown(&self, now: NaiveDateTime) -> String {
        let mut lines = vec![
            "# Library status".to_string(),
            String::new(),
            format!("**Updated:** {}", now.format("%Y-%m-%d %H:%M")),
            String::new(),
            "## Statistics".to_string(),
            format!("- **Total books**: {}", self.total),
            format!("- **Unreturned books**: {}", self.unreturned_count()),
            format!("- **Return rate**: {:.1}%", self.return_rate),
            String::new(),
            "## Status".to_string(),
        ];

        if self.unreturned.is_empty() {
            lines.push("All books have been returned.".to_string());
        } else {
            lines.push(format!("{} books are not yet returned.", self.unreturned_count()));
            lines.push(String::new());
            lines.push("### Unreturned books".to_string());
            lines.push("| Title | Borrower | Status |".to_string());
            lines.push("|------|--------|------|".to_string());
            for book in &self.unreturned {
                lines.push(format!(
                    "| {} | {} | {} |",
                    escape_cell(&book.title),
                    escape_cell(&book.borrower),
                    escape_cell(&book.status)
                ));
            }
        }

        lines.push(String::new());
        lines.push("---".to_string());
        lines.push("*Automatically generated report*".to_string());
        lines.join("\n")
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
