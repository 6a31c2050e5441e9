//! Per-table view state: cached rows, page, sort toggles and search.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BookshelfError;
use crate::status::LibraryEntry;

use super::pagination::{page_count, paginate};
use super::sort::{compare_cells, SortDirection};
use super::view::{RowView, TableView};

/// Rows per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Label of the extra per-row link column.
pub const EXTRA_COLUMN_LABEL: &str = "QR";

/// The two tables of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableId {
    /// The raw loan log.
    Loans,
    /// The catalog with derived loan status.
    Catalog,
}

impl TableId {
    pub fn as_str(self) -> &'static str {
        match self {
            TableId::Loans => "loans",
            TableId::Catalog => "catalog",
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TableId {
    type Err = BookshelfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "loans" | "loan" | "loantable" => Ok(TableId::Loans),
            "catalog" | "library" | "librarytable" => Ok(TableId::Catalog),
            _ => Err(BookshelfError::Config(format!(
                "Unknown table: {}. Use loans or catalog.",
                s
            ))),
        }
    }
}

/// Cached dataset and interaction state of one table.
///
/// `base` holds the rows last passed to [`TableState::render`]; `view` is
/// what is currently displayed after search. Sorting reorders both.
#[derive(Debug, Clone)]
pub struct TableState {
    id: TableId,
    header: Vec<String>,
    base: Vec<LibraryEntry>,
    view: Vec<LibraryEntry>,
    page: usize,
    page_size: usize,
    sort_toggles: HashMap<usize, SortDirection>,
    active_sort: Option<(usize, SortDirection)>,
    query: String,
    with_extra_column: bool,
    status_column: Option<usize>,
    wrap_columns: Vec<usize>,
}

impl TableState {
    /// Create an empty table.
    pub fn new(id: TableId) -> Self {
        Self::with_page_size(id, DEFAULT_PAGE_SIZE)
    }

    /// Create an empty table with a custom page size.
    pub fn with_page_size(id: TableId, page_size: usize) -> Self {
        Self {
            id,
            header: Vec::new(),
            base: Vec::new(),
            view: Vec::new(),
            page: 1,
            page_size: page_size.max(1),
            sort_toggles: HashMap::new(),
            active_sort: None,
            query: String::new(),
            with_extra_column: false,
            status_column: None,
            wrap_columns: Vec::new(),
        }
    }

    /// Mark the column holding status text, enabling row styles and
    /// classification refresh after sorting.
    pub fn with_status_column(mut self, column: Option<usize>) -> Self {
        self.status_column = column;
        self
    }

    /// Columns whose text should wrap when displayed.
    pub fn with_wrap_columns(mut self, columns: Vec<usize>) -> Self {
        self.wrap_columns = columns;
        self
    }

    /// Cache `rows` as the table's dataset and show the first page.
    ///
    /// Sort toggles survive re-rendering; the search query does not.
    pub fn render(&mut self, header: Vec<String>, rows: Vec<LibraryEntry>, with_extra_column: bool) {
        self.header = header;
        self.view = rows.clone();
        self.base = rows;
        self.page = 1;
        self.query.clear();
        self.active_sort = None;
        self.with_extra_column = with_extra_column;
        debug!(table = %self.id, rows = self.base.len(), pages = self.total_pages(), "Rendered table");
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Rows currently displayed (after search), in display order.
    pub fn rows(&self) -> &[LibraryEntry] {
        &self.view
    }

    /// Rows last passed to [`TableState::render`], in current sort order.
    pub fn base_rows(&self) -> &[LibraryEntry] {
        &self.base
    }

    pub fn current_page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Current sort column and direction, if any.
    pub fn active_sort(&self) -> Option<(usize, SortDirection)> {
        self.active_sort
    }

    /// Total pages of the current view, at least one.
    pub fn total_pages(&self) -> usize {
        page_count(self.view.len(), self.page_size)
    }

    /// Move to `page`, clamped into range. Returns the page shown.
    pub fn go_to_page(&mut self, page: usize) -> usize {
        self.page = page.clamp(1, self.total_pages());
        self.page
    }

    /// Rows of the current page.
    pub fn page_rows(&self) -> &[LibraryEntry] {
        let start = (self.page - 1).saturating_mul(self.page_size).min(self.view.len());
        let end = (start + self.page_size).min(self.view.len());
        &self.view[start..end]
    }

    /// Sort by `column`, toggling its direction. Returns the direction
    /// applied, or `None` when the column is out of range.
    pub fn sort(&mut self, column: usize) -> Option<SortDirection> {
        self.sort_at(column, Local::now().naive_local())
    }

    /// [`TableState::sort`] with classifications refreshed against `now`.
    pub fn sort_at(&mut self, column: usize, now: NaiveDateTime) -> Option<SortDirection> {
        if column >= self.header.len() {
            return None;
        }

        let direction = match self.sort_toggles.get(&column) {
            Some(SortDirection::Ascending) => SortDirection::Descending,
            _ => SortDirection::Ascending,
        };
        self.sort_toggles.insert(column, direction);
        self.active_sort = Some((column, direction));

        self.base
            .sort_by(|a, b| direction.apply(compare_cells(a.cell(column), b.cell(column))));
        self.refresh_statuses(now);
        self.view = self.matching(&self.query);
        self.page = 1;

        debug!(table = %self.id, column, ?direction, "Sorted table");
        Some(direction)
    }

    /// Keep rows with any cell containing `query` (case-insensitive). An
    /// empty query restores every cached row. Returns the number of matches.
    pub fn search(&mut self, query: &str) -> usize {
        self.query = query.trim().to_string();
        self.view = self.matching(&self.query);
        self.page = 1;
        self.view.len()
    }

    fn matching(&self, query: &str) -> Vec<LibraryEntry> {
        if query.is_empty() {
            return self.base.clone();
        }

        let needle = query.to_lowercase();
        self.base
            .iter()
            .filter(|row| row.cells.iter().any(|c| c.to_lowercase().contains(&needle)))
            .cloned()
            .collect()
    }

    fn refresh_statuses(&mut self, now: NaiveDateTime) {
        let Some(column) = self.status_column else {
            return;
        };
        for entry in &mut self.base {
            if let Some(display) = entry.refresh_status_at(now).map(str::to_string) {
                if let Some(cell) = entry.cells.get_mut(column) {
                    *cell = display;
                }
            }
        }
    }

    /// Build the displayed page. `link` supplies the extra column's target
    /// for each row when the table was rendered with one.
    pub fn page_view<F>(&self, link: F) -> TableView
    where
        F: Fn(&LibraryEntry) -> Option<String>,
    {
        let mut header = self.header.clone();
        if self.with_extra_column {
            header.push(EXTRA_COLUMN_LABEL.to_string());
        }

        let width = self.header.len();
        let rows = self
            .page_rows()
            .iter()
            .map(|entry| RowView {
                cells: (0..width).map(|i| entry.cell(i).to_string()).collect(),
                style: entry.style(self.status_column),
                link: if self.with_extra_column { link(entry) } else { None },
            })
            .collect();

        TableView {
            table: self.id,
            header,
            rows,
            pagination: paginate(self.page, self.total_pages(), self.view.len()),
            sort: self.active_sort,
            query: self.query.clone(),
            wrap_columns: self.wrap_columns.clone(),
        }
    }
}
