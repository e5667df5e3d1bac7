// ============================================================================
// memgrid Library
// ============================================================================
//
// In-memory data grid: named key/value maps, mappings that expose them as
// typed tables, and a small SQL dialect (CREATE MAPPING, INSERT, UPDATE,
// DELETE, SELECT with WHERE/JOIN/ORDER BY/LIMIT and parameters) executed
// against them.

pub mod config;
pub mod core;
pub mod facade;
pub mod result;
pub mod storage;
mod evaluator;
mod executor;
mod parser;
mod planner;
mod plugins;

// Re-export main types for convenience
pub use config::GridConfig;
pub use core::{DataType, DbError, Result, Value};
pub use facade::{Grid, MapHandle, SqlService};
pub use result::{ColumnMetadata, Cursor, Row, RowMetadata};
pub use storage::Entry;
