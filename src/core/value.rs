use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use serde_json::Value as JsonValue;
use crate::core::{DbError, Result};

/// A key, a stored value, or a scalar flowing through query evaluation.
///
/// Records are flat: every field holds a scalar. The derived ordering
/// (`Null < Boolean < Integer < Text < Record`) makes values usable as
/// map keys; SQL comparisons go through [`Value::compare`] instead, which
/// refuses to order values of different types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Text(String),
    Record(BTreeMap<String, Value>),
}

impl Value {
    /// Build a flat record from `(field, value)` pairs.
    pub fn record<K, V, I>(fields: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn compare(&self, other: &Value) -> Result<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Ok(Ordering::Equal),
            (Value::Null, _) => Ok(Ordering::Greater),
            (_, Value::Null) => Ok(Ordering::Less),

            (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(a.cmp(b)),

            _ => Err(DbError::TypeMismatch(format!(
                "Cannot compare incompatible types: {} and {}",
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Boolean(_) => "BOOLEAN",
            Self::Integer(_) => "INTEGER",
            Self::Text(_) => "VARCHAR",
            Self::Record(_) => "RECORD",
        }
    }

    /// SQL truthiness: only `TRUE` passes a filter.
    pub fn as_bool(&self) -> bool {
        matches!(self, Self::Boolean(true))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Record(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::Record(_))
    }

    /// Convert a JSON document into a value.
    ///
    /// Top-level objects become records; nested objects and arrays are kept
    /// as their JSON text so records stay flat.
    pub fn from_json(json: &JsonValue) -> Result<Self> {
        match json {
            JsonValue::Object(map) => {
                let mut fields = BTreeMap::new();
                for (name, field) in map {
                    let value = match field {
                        JsonValue::Object(_) | JsonValue::Array(_) => Value::Text(field.to_string()),
                        scalar => Self::scalar_from_json(scalar)?,
                    };
                    fields.insert(name.clone(), value);
                }
                Ok(Value::Record(fields))
            }
            JsonValue::Array(_) => Ok(Value::Text(json.to_string())),
            scalar => Self::scalar_from_json(scalar),
        }
    }

    fn scalar_from_json(json: &JsonValue) -> Result<Self> {
        match json {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Bool(b) => Ok(Value::Boolean(*b)),
            JsonValue::String(s) => Ok(Value::Text(s.clone())),
            JsonValue::Number(n) => n.as_i64().map(Value::Integer).ok_or_else(|| {
                DbError::TypeMismatch(format!("Cannot store non-integer JSON number {}", n))
            }),
            JsonValue::Object(_) | JsonValue::Array(_) => Ok(Value::Text(json.to_string())),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Boolean(b) => JsonValue::Bool(*b),
            Self::Integer(i) => JsonValue::from(*i),
            Self::Text(s) => JsonValue::String(s.clone()),
            Self::Record(fields) => JsonValue::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "{}", s),
            Self::Record(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}
