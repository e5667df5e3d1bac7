pub mod adapter;
pub mod ast;
mod mapping;

pub use adapter::{SqlParserAdapter, DEFAULT_MAX_STATEMENT_LEN};
