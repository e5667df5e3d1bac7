use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Table '{0}' not found, did you forget to CREATE MAPPING?")]
    UnknownTable(String),

    #[error("Mapping '{0}' already exists")]
    DuplicateMapping(String),

    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound { column: String, table: String },

    #[error("Table '{table}' expects {expected} values per row, got {actual}")]
    ColumnCount {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("Statement has {expected} parameter placeholders, got {actual} parameters")]
    ParameterCount { expected: usize, actual: usize },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Key {key} not found in map '{map}'")]
    KeyNotFound { map: String, key: String },

    #[error("Transient store error: {0}")]
    TransientStoreError(String),

    #[error("Fatal store error: {0}")]
    FatalStoreError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DbError {
    /// Whether the caller may retry the failed operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStoreError(_))
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::FatalStoreError(err.to_string())
    }
}
