//! Table views: pagination, sorting, search and catalog filters.
//!
//! Each table owns a [`TableState`]; there is no shared cache. Operations
//! are synchronous and mutate only the state they are called on.

mod filter;
mod pagination;
mod sort;
mod state;
mod view;

pub use filter::{CatalogFilter, RECENT_WINDOW_DAYS};
pub use pagination::{page_count, paginate, PageItem, Pagination};
pub use sort::{compare_cells, natural_cmp, parse_numeric, SortDirection};
pub use state::{TableId, TableState, DEFAULT_PAGE_SIZE, EXTRA_COLUMN_LABEL};
pub use view::{RowView, TableView};
