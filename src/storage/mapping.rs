use std::collections::{BTreeMap, HashSet};
use std::fmt;
use crate::core::{Column, DataType, DbError, Result, Schema, Tuple, Value};
use super::Entry;

/// Serialized shape of a key or a value in the backing map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Varchar,
    Int,
    BigInt,
    JsonFlat,
}

impl Format {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "varchar" => Some(Self::Varchar),
            "int" | "integer" => Some(Self::Int),
            "bigint" => Some(Self::BigInt),
            "json-flat" => Some(Self::JsonFlat),
            _ => None,
        }
    }

    /// Column type of the whole object for scalar formats.
    pub fn scalar_type(&self) -> Option<DataType> {
        match self {
            Self::Varchar => Some(DataType::Varchar),
            Self::Int => Some(DataType::Int),
            Self::BigInt => Some(DataType::BigInt),
            Self::JsonFlat => None,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Self::JsonFlat)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Varchar => write!(f, "varchar"),
            Self::Int => write!(f, "int"),
            Self::BigInt => write!(f, "bigint"),
            Self::JsonFlat => write!(f, "json-flat"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Key,
    Value,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key => write!(f, "__key"),
            Self::Value => write!(f, "this"),
        }
    }
}

/// Where a column lives inside an entry: `__key`, `this`, `__key.f` or `this.f`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnPath {
    pub side: Side,
    pub field: Option<String>,
}

impl ColumnPath {
    pub fn whole(side: Side) -> Self {
        Self { side, field: None }
    }

    pub fn field(side: Side, field: impl Into<String>) -> Self {
        Self {
            side,
            field: Some(field.into()),
        }
    }

    pub fn parse(path: &str) -> Option<Self> {
        let (head, field) = match path.split_once('.') {
            Some((head, field)) if !field.is_empty() && !field.contains('.') => (head, Some(field)),
            Some(_) => return None,
            None => (path, None),
        };
        let side = match head {
            "__key" => Side::Key,
            "this" => Side::Value,
            _ => return None,
        };
        Some(Self {
            side,
            field: field.map(str::to_string),
        })
    }
}

impl fmt::Display for ColumnPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}.{}", self.side, field),
            None => write!(f, "{}", self.side),
        }
    }
}

/// Column as written in a `CREATE MAPPING` column list.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: DataType,
    pub external_name: Option<String>,
}

/// Unvalidated mapping definition, as produced by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingDefinition {
    pub name: String,
    pub external_name: Option<String>,
    pub columns: Vec<ColumnSpec>,
    pub type_name: String,
    pub options: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingColumn {
    pub name: String,
    pub data_type: DataType,
    pub path: ColumnPath,
}

/// A validated mapping: how entries of one map are seen as rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    name: String,
    object_name: String,
    columns: Vec<MappingColumn>,
    key_format: Format,
    value_format: Format,
    options: BTreeMap<String, String>,
}

impl Mapping {
    pub fn from_definition(def: MappingDefinition) -> Result<Self> {
        let MappingDefinition {
            name,
            external_name,
            columns,
            type_name,
            options,
        } = def;

        if !type_name.eq_ignore_ascii_case("IMap") {
            return Err(DbError::ParseError(format!(
                "Unsupported mapping type '{}' for mapping '{}', expected IMap",
                type_name, name
            )));
        }

        let options: BTreeMap<String, String> = options.into_iter().collect();
        let key_format = Self::required_format(&name, &options, "keyFormat")?;
        let value_format = Self::required_format(&name, &options, "valueFormat")?;

        let columns = if columns.is_empty() {
            Self::implicit_columns(&name, key_format, value_format)?
        } else {
            columns
                .into_iter()
                .map(|spec| Self::resolve_column(&name, spec, key_format, value_format))
                .collect::<Result<Vec<_>>>()?
        };

        let mapping = Self {
            object_name: external_name.unwrap_or_else(|| name.clone()),
            name,
            columns,
            key_format,
            value_format,
            options,
        };
        mapping.validate()?;
        Ok(mapping)
    }

    fn required_format(name: &str, options: &BTreeMap<String, String>, option: &str) -> Result<Format> {
        let raw = options.get(option).ok_or_else(|| {
            DbError::ParseError(format!("Mapping '{}' is missing the '{}' option", name, option))
        })?;
        Format::parse(raw).ok_or_else(|| {
            DbError::ParseError(format!(
                "Mapping '{}' has unsupported {} '{}'",
                name, option, raw
            ))
        })
    }

    fn implicit_columns(name: &str, key_format: Format, value_format: Format) -> Result<Vec<MappingColumn>> {
        let mut columns = Vec::with_capacity(2);
        for (side, format) in [(Side::Key, key_format), (Side::Value, value_format)] {
            let data_type = format.scalar_type().ok_or_else(|| {
                DbError::ParseError(format!(
                    "Mapping '{}' with {} format json-flat needs an explicit column list",
                    name, side
                ))
            })?;
            columns.push(MappingColumn {
                name: side.to_string(),
                data_type,
                path: ColumnPath::whole(side),
            });
        }
        Ok(columns)
    }

    fn resolve_column(name: &str, spec: ColumnSpec, key_format: Format, value_format: Format) -> Result<MappingColumn> {
        let path = match &spec.external_name {
            Some(external) => ColumnPath::parse(external).ok_or_else(|| {
                DbError::ParseError(format!(
                    "Column '{}' of mapping '{}' has invalid external name '{}'",
                    spec.name, name, external
                ))
            })?,
            None => match spec.name.as_str() {
                "__key" => ColumnPath::whole(Side::Key),
                "this" => ColumnPath::whole(Side::Value),
                field if value_format.is_record() => ColumnPath::field(Side::Value, field),
                field if key_format.is_record() => ColumnPath::field(Side::Key, field),
                _ => {
                    return Err(DbError::ParseError(format!(
                        "Column '{}' of mapping '{}' needs an EXTERNAL NAME, neither format is json-flat",
                        spec.name, name
                    )));
                }
            },
        };
        Ok(MappingColumn {
            name: spec.name,
            data_type: spec.data_type,
            path,
        })
    }

    fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        let mut paths = HashSet::new();
        for col in &self.columns {
            if !names.insert(col.name.as_str()) {
                return Err(self.column_error(col, "is declared more than once"));
            }
            if !paths.insert(&col.path) {
                return Err(self.column_error(col, &format!("maps '{}' a second time", col.path)));
            }
        }

        for (side, format) in [(Side::Key, self.key_format), (Side::Value, self.value_format)] {
            let on_side: Vec<&MappingColumn> =
                self.columns.iter().filter(|c| c.path.side == side).collect();

            match format.scalar_type() {
                Some(expected) => {
                    if let Some(col) = on_side.iter().find(|c| c.path.field.is_some()) {
                        return Err(self.column_error(
                            col,
                            &format!("reads a field of {}, but {} format is {}", side, side, format),
                        ));
                    }
                    let Some(col) = on_side.first() else {
                        return Err(DbError::ParseError(format!(
                            "Mapping '{}' must map a column to {}",
                            self.name, side
                        )));
                    };
                    if col.data_type != expected {
                        return Err(self.column_error(
                            col,
                            &format!("has type {}, but {} format {} needs {}", col.data_type, side, format, expected),
                        ));
                    }
                }
                None => {
                    if let Some(col) = on_side.iter().find(|c| c.path.field.is_none()) {
                        return Err(self.column_error(
                            col,
                            &format!("maps the whole {}, but its format is json-flat", side),
                        ));
                    }
                    if side == Side::Key && on_side.is_empty() {
                        return Err(DbError::ParseError(format!(
                            "Mapping '{}' must map at least one column to a field of __key",
                            self.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn column_error(&self, col: &MappingColumn, problem: &str) -> DbError {
        DbError::ParseError(format!(
            "Column '{}' of mapping '{}' {}",
            col.name, self.name, problem
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the backing map.
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn columns(&self) -> &[MappingColumn] {
        &self.columns
    }

    pub fn key_format(&self) -> Format {
        self.key_format
    }

    pub fn value_format(&self) -> Format {
        self.value_format
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| DbError::ColumnNotFound {
                column: name.to_string(),
                table: self.name.clone(),
            })
    }

    pub fn is_key_column(&self, idx: usize) -> bool {
        self.columns
            .get(idx)
            .is_some_and(|c| c.path.side == Side::Key)
    }

    /// Schema of the rows this mapping produces, qualified by `qualifier`.
    pub fn schema(&self, qualifier: &str) -> Schema {
        Schema::new(
            self.columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data_type).qualified(qualifier))
                .collect(),
        )
    }

    /// Project an entry into one value per column.
    pub fn decode(&self, entry: &Entry) -> Result<Tuple> {
        self.columns
            .iter()
            .map(|col| {
                let object = match col.path.side {
                    Side::Key => &entry.key,
                    Side::Value => &entry.value,
                };
                let raw = match &col.path.field {
                    None if object.is_scalar() => object,
                    None => return Err(self.shape_error(col, object)),
                    Some(field) => match object.as_record() {
                        Some(fields) => fields.get(field).unwrap_or(&Value::Null),
                        None => return Err(self.shape_error(col, object)),
                    },
                };
                col.data_type.coerce(raw).ok_or_else(|| {
                    DbError::TypeMismatch(format!(
                        "Cannot read {} value {} into column '{}' ({}) of table '{}'",
                        raw.type_name(),
                        raw,
                        col.name,
                        col.data_type,
                        self.name
                    ))
                })
            })
            .collect()
    }

    fn shape_error(&self, col: &MappingColumn, object: &Value) -> DbError {
        DbError::TypeMismatch(format!(
            "Stored {} of type {} does not match the format of column '{}' of table '{}'",
            col.path.side,
            object.type_name(),
            col.name,
            self.name
        ))
    }

    /// New stored value for `entry` after assigning `(column, value)` pairs.
    ///
    /// Record values are patched in place: fields no column is assigned to,
    /// including fields this mapping does not declare, keep their stored form.
    pub fn apply_assignments(&self, entry: &Entry, assignments: &[(usize, Value)]) -> Result<Value> {
        let mut value = entry.value.clone();
        for (idx, v) in assignments {
            let col = self.columns.get(*idx).ok_or_else(|| {
                DbError::FatalStoreError(format!("Column #{} is out of range for table '{}'", idx, self.name))
            })?;
            self.check_writable(col, v)?;
            match (&col.path.side, &col.path.field) {
                (Side::Key, _) => {
                    return Err(DbError::ParseError(format!(
                        "Cannot update key column '{}' of table '{}'",
                        col.name, self.name
                    )));
                }
                (Side::Value, None) => value = v.clone(),
                (Side::Value, Some(field)) => {
                    let Value::Record(fields) = &mut value else {
                        return Err(self.shape_error(col, &value));
                    };
                    if v.is_null() {
                        fields.remove(field);
                    } else {
                        fields.insert(field.clone(), v.clone());
                    }
                }
            }
        }
        if value.is_null() {
            return Err(DbError::TypeMismatch(format!(
                "Cannot write NULL into the value of table '{}'",
                self.name
            )));
        }
        Ok(value)
    }

    fn check_writable(&self, col: &MappingColumn, v: &Value) -> Result<()> {
        if col.data_type.is_compatible(v) {
            return Ok(());
        }
        Err(DbError::TypeMismatch(format!(
            "Cannot write {} value {} into column '{}' ({}) of table '{}'",
            v.type_name(),
            v,
            col.name,
            col.data_type,
            self.name
        )))
    }

    /// Build the entry for a full row, one value per column.
    pub fn encode(&self, values: &[Value]) -> Result<Entry> {
        if values.len() != self.columns.len() {
            return Err(DbError::ColumnCount {
                table: self.name.clone(),
                expected: self.columns.len(),
                actual: values.len(),
            });
        }

        let mut key_fields = BTreeMap::new();
        let mut value_fields = BTreeMap::new();
        let mut key = None;
        let mut value = None;

        for (col, v) in self.columns.iter().zip(values) {
            self.check_writable(col, v)?;
            match (&col.path.side, &col.path.field) {
                (Side::Key, None) => key = Some(v.clone()),
                (Side::Value, None) => value = Some(v.clone()),
                (Side::Key, Some(field)) => {
                    key_fields.insert(field.clone(), v.clone());
                }
                (Side::Value, Some(field)) => {
                    if !v.is_null() {
                        value_fields.insert(field.clone(), v.clone());
                    }
                }
            }
        }

        let key = match key {
            Some(key) => key,
            None => Value::Record(key_fields),
        };
        let value = match value {
            Some(value) => value,
            None => Value::Record(value_fields),
        };

        if key.is_null() {
            return Err(DbError::TypeMismatch(format!(
                "Cannot write NULL into the key of table '{}'",
                self.name
            )));
        }
        if value.is_null() {
            return Err(DbError::TypeMismatch(format!(
                "Cannot write NULL into the value of table '{}'",
                self.name
            )));
        }
        Ok(Entry { key, value })
    }
}
