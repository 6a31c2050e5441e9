//! Input parsing and sheet representation.

mod parser;
mod source;

pub use parser::{content_hash, Parser, ParserConfig};
pub use source::{Sheet, SourceKind, SourceMetadata};
