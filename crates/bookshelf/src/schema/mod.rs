//! Column resolution for loan log and catalog headers.

mod column;
mod table;

pub use column::{find_column, includes_any, normalize, normalize_header, ColumnRole};
pub use table::{
    CatalogSchema, LoanLogSchema, SYNTHESIZED_BORROWER_COLUMN, SYNTHESIZED_STATUS_COLUMN,
};
