//! Input parsing and data source handling.

mod dataset;
mod parser;
mod source;

pub use dataset::{Dataset, DatasetLoader};
pub use parser::{Parser, ParserConfig};
pub use source::{DataTable, SourceMetadata};
