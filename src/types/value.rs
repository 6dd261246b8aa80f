use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

use crate::types::error::DatabaseError;

/// Column types a relation can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Int,
    Text,
    Boolean,
}

impl DataType {
    /// Map a SQL type name onto a column type. Anything outside INT, TEXT and
    /// BOOLEAN (DOUBLE included) is rejected.
    pub fn from_sql_name(name: &str) -> Result<Self, DatabaseError> {
        match name.trim().to_ascii_uppercase().as_str() {
            "INT" | "INTEGER" => Ok(DataType::Int),
            "TEXT" => Ok(DataType::Text),
            "BOOLEAN" => Ok(DataType::Boolean),
            _ => Err(DatabaseError::relation(format!(
                "unrecognized data type: {}",
                name
            ))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int => "INT",
            DataType::Text => "TEXT",
            DataType::Boolean => "BOOLEAN",
        };
        f.write_str(name)
    }
}

/// Type information attached to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAttribute {
    pub data_type: DataType,
}

impl ColumnAttribute {
    pub fn new(data_type: DataType) -> Self {
        Self { data_type }
    }
}

// Variant order doubles as the cross-type ordering used by index keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    Int(i32),
    Text(String),
    Boolean(bool),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Int,
            Value::Text(_) => DataType::Text,
            Value::Boolean(_) => DataType::Boolean,
        }
    }

    /// Number of bytes the value takes in a marshaled record.
    pub fn marshaled_size(&self) -> usize {
        match self {
            Value::Int(_) => 4,
            Value::Text(s) => 2 + s.len(),
            Value::Boolean(_) => 1,
        }
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "\"{}\"", s),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// A row, a predicate, or a key: column name to value.
pub type ValueDict = HashMap<String, Value>;

/// Build a [`ValueDict`] from `(column, value)` pairs.
pub fn value_dict<K, V, I>(pairs: I) -> ValueDict
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
