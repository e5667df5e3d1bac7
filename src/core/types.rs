use std::fmt;
use super::{DbError, Result, Value};

/// Decoded column values of one entry, positionally matching a [`Schema`].
pub type Tuple = Vec<Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Varchar,
    Boolean,
    Int,
    BigInt,
}

impl DataType {
    /// Parse a SQL type name as it appears in a mapping column list.
    pub fn from_sql_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "VARCHAR" | "STRING" => Some(Self::Varchar),
            "BOOLEAN" | "BOOL" => Some(Self::Boolean),
            "INT" | "INTEGER" => Some(Self::Int),
            "BIGINT" => Some(Self::BigInt),
            _ => None,
        }
    }

    /// Strict check used for bound parameters and literals.
    pub fn is_compatible(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Varchar, Value::Text(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Int, Value::Integer(i)) => i32::try_from(*i).is_ok(),
            (Self::BigInt, Value::Integer(_)) => true,
            _ => false,
        }
    }

    /// Lenient conversion used when reading stored values into a column.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        if self.is_compatible(value) {
            return Some(value.clone());
        }
        match (self, value) {
            (Self::Varchar, Value::Integer(i)) => Some(Value::Text(i.to_string())),
            (Self::Varchar, Value::Boolean(b)) => Some(Value::Text(b.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Varchar => write!(f, "VARCHAR"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Int => write!(f, "INT"),
            Self::BigInt => write!(f, "BIGINT"),
        }
    }
}

/// A column visible to expression evaluation.
///
/// Names and qualifiers are case-sensitive, like the identifiers they come from.
/// `qualifier` is the table alias (or table name) the column came from;
/// `data_type` is `None` for computed expressions whose type is not tracked.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub data_type: Option<DataType>,
    pub qualifier: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type),
            qualifier: None,
        }
    }

    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            qualifier: None,
        }
    }

    pub fn qualified(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    fn matches(&self, qualifier: Option<&str>, name: &str) -> bool {
        if self.name != name {
            return false;
        }
        match qualifier {
            None => true,
            Some(q) => self.qualifier.as_deref() == Some(q),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn find_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    /// Concatenate two schemas, as the output of a join.
    pub fn join(&self, other: &Schema) -> Schema {
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        Schema { columns }
    }

    /// Resolve a possibly qualified column reference to its ordinal.
    pub fn resolve(&self, qualifier: Option<&str>, name: &str) -> Result<usize> {
        let mut found = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, col)| col.matches(qualifier, name))
            .map(|(idx, _)| idx);

        let Some(first) = found.next() else {
            return Err(DbError::ColumnNotFound {
                column: name.to_string(),
                table: qualifier
                    .map(str::to_string)
                    .unwrap_or_else(|| self.qualifiers().join(", ")),
            });
        };

        if found.next().is_some() {
            return Err(DbError::ParseError(format!(
                "Column reference '{}' is ambiguous, qualify it with a table alias",
                name
            )));
        }

        Ok(first)
    }

    fn qualifiers(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for col in &self.columns {
            if let Some(q) = &col.qualifier
                && !names.contains(q)
            {
                names.push(q.clone());
            }
        }
        names
    }
}
