#![allow(clippy::module_inception)]
pub mod cursor;
pub mod result;
pub mod row;

pub use cursor::Cursor;
pub use result::QueryResult;
pub use row::{ColumnMetadata, Row, RowIndex, RowMetadata};
