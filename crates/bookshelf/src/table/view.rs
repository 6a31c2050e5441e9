//! Displayable page of a table.

use serde::{Deserialize, Serialize};

use crate::status::RowStyle;

use super::pagination::Pagination;
use super::sort::SortDirection;
use super::state::TableId;

/// One displayed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowView {
    /// Cells, exactly as wide as the data header.
    pub cells: Vec<String>,
    pub style: RowStyle,
    /// Target of the extra link column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// The current page of a table, ready to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableView {
    pub table: TableId,
    /// Header, including the extra column label when shown.
    pub header: Vec<String>,
    pub rows: Vec<RowView>,
    pub pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<(usize, SortDirection)>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub query: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wrap_columns: Vec<usize>,
}
