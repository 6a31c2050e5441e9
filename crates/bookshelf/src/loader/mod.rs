//! Data loading from the sheet API or local CSV files.
//!
//! The sheet API is tried first when a backend URL is configured. Any
//! failure (network, HTTP status, `success: false`, empty payload) degrades
//! to reading `books.csv` and `library.csv` from the data directory.

mod data;
mod mock;
mod sheet_api;

pub use data::{
    DataLoader, LoadedData, CATALOG_FILE, DEFAULT_CATALOG_SHEET, DEFAULT_LOAN_SHEET, LOAN_LOG_FILE,
};
pub use mock::MockSheetSource;
pub use sheet_api::{parse_sheet_payload, SheetApiClient, SheetSource};
