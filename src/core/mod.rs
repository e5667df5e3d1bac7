pub mod error;
pub mod types;
pub mod value;

pub use error::{DbError, Result};
pub use types::{Column, DataType, Schema, Tuple};
pub use value::Value;
