//! Bookshelf: library circulation tracker.
//!
//! Bookshelf loads a book catalog and a loan log, either from a
//! spreadsheet-backed HTTP API or from local CSV files, and derives each
//! book's loan state from the most recent log entry for its code.
//!
//! # Core Pieces
//!
//! - **Column resolution**: header cells are matched against candidate names,
//!   so exports with slightly different headers still load
//! - **Status engine**: returned, on loan with days left, or overdue after 14 days
//! - **Table views**: paginated, sortable, searchable and filterable tables
//! - **Notification relay**: status reports and circulation messages for a
//!   wiki/messenger backend
//!
//! # Example
//!
//! ```no_run
//! use bookshelf::{Bookshelf, Settings, TableId};
//!
//! # async fn example() -> bookshelf::Result<()> {
//! let mut shelf = Bookshelf::load(Settings::default()).await?;
//! shelf.search(TableId::Catalog, "hesse");
//!
//! let view = shelf.view(TableId::Catalog);
//! println!("{} matching books", view.pagination.total_items);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod input;
pub mod intake;
pub mod loader;
pub mod relay;
pub mod report;
pub mod schema;
pub mod status;
pub mod table;

mod bookshelf;

pub use crate::bookshelf::{circulation_changes, data_loader, publish_report, Bookshelf, LoadInfo};
pub use config::Settings;
pub use error::{BookshelfError, Result};
pub use input::{Sheet, SourceKind, SourceMetadata};
pub use intake::IntakeForm;
pub use loader::{DataLoader, LoadedData};
pub use relay::{BookAction, BookInfo, ConnectionReport, NotificationRelay, RelayConfig, RelayResponse};
pub use report::StatusSummary;
pub use status::{DerivedCatalog, LibraryEntry, LoanState, LoanStatus};
pub use table::{CatalogFilter, SortDirection, TableId, TableState, TableView};
