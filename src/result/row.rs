use std::fmt;
use std::sync::Arc;
use serde_json::{Map, Value as JsonValue};
use crate::core::{Column, DataType, DbError, Result, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub name: String,
    /// `None` for computed columns whose type is not tracked
    pub data_type: Option<DataType>,
}

/// Column names and types shared by every row of one result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowMetadata {
    columns: Vec<ColumnMetadata>,
}

impl RowMetadata {
    pub fn from_columns(columns: &[Column]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|c| ColumnMetadata {
                    name: c.name.clone(),
                    data_type: c.data_type,
                })
                .collect(),
        }
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, idx: usize) -> Option<&ColumnMetadata> {
        self.columns.get(idx)
    }

    /// First column called `name`.
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Something a row can be indexed by: an ordinal or a column name.
pub trait RowIndex: fmt::Display {
    fn position(&self, metadata: &RowMetadata) -> Option<usize>;
}

impl RowIndex for usize {
    fn position(&self, metadata: &RowMetadata) -> Option<usize> {
        (*self < metadata.column_count()).then_some(*self)
    }
}

impl RowIndex for &str {
    fn position(&self, metadata: &RowMetadata) -> Option<usize> {
        metadata.find_column(self)
    }
}

impl RowIndex for String {
    fn position(&self, metadata: &RowMetadata) -> Option<usize> {
        metadata.find_column(self)
    }
}

/// One row of a query result.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    metadata: Arc<RowMetadata>,
    values: Vec<Value>,
}

impl Row {
    pub(crate) fn new(metadata: Arc<RowMetadata>, values: Vec<Value>) -> Self {
        Self { metadata, values }
    }

    pub fn get<I: RowIndex>(&self, index: I) -> Option<&Value> {
        index.position(&self.metadata).and_then(|i| self.values.get(i))
    }

    /// Like [`get`](Self::get) but a missing column is an error.
    pub fn value<I: RowIndex>(&self, index: I) -> Result<&Value> {
        index
            .position(&self.metadata)
            .and_then(|i| self.values.get(i))
            .ok_or_else(|| DbError::ColumnNotFound {
                column: index.to_string(),
                table: "result".to_string(),
            })
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn metadata(&self) -> &RowMetadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The row as a JSON object keyed by column name.
    pub fn to_json(&self) -> JsonValue {
        let fields: Map<String, JsonValue> = self
            .metadata
            .columns()
            .iter()
            .zip(&self.values)
            .map(|(col, value)| (col.name.clone(), value.to_json()))
            .collect();
        JsonValue::Object(fields)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.values.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}
