//! API request handlers.

mod catalog;
mod sync;
mod tables;

pub use catalog::*;
pub use sync::*;
pub use tables::*;
