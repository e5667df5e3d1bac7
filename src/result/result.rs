use std::sync::Arc;
use crate::core::{Column, Tuple};
use super::RowMetadata;

/// Materialized outcome of one statement, before it is handed out as a cursor.
#[derive(Debug)]
pub struct QueryResult {
    pub(crate) metadata: Arc<RowMetadata>,
    pub(crate) rows: Vec<Tuple>,
    pub(crate) update_count: Option<u64>,
}

impl QueryResult {
    /// Result of a DDL statement.
    pub fn empty() -> Self {
        Self::affected(0)
    }

    /// Result of a DML statement.
    pub fn affected(count: u64) -> Self {
        Self {
            metadata: Arc::new(RowMetadata::default()),
            rows: Vec::new(),
            update_count: Some(count),
        }
    }

    /// Result of a query.
    pub fn new(columns: Vec<Column>, rows: Vec<Tuple>) -> Self {
        Self {
            metadata: Arc::new(RowMetadata::from_columns(&columns)),
            rows,
            update_count: None,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_row_set(&self) -> bool {
        self.update_count.is_none()
    }
}
