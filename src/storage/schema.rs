use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{
    error::DatabaseError,
    value::{ColumnAttribute, DataType, Value, ValueDict},
};

/// Represents a column definition in a table schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub attribute: ColumnAttribute,
    pub position: usize,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: DataType, position: usize) -> Self {
        Self {
            name: name.into(),
            attribute: ColumnAttribute::new(data_type),
            position,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.attribute.data_type
    }
}

/// Ordered column list of a relation. Column order fixes the marshaled byte
/// layout of every row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(
        table_name: impl Into<String>,
        columns: Vec<(String, DataType)>,
    ) -> Result<Self, DatabaseError> {
        let table_name = table_name.into();
        if columns.is_empty() {
            return Err(DatabaseError::relation(format!(
                "table '{}' must have at least one column",
                table_name
            )));
        }

        let mut seen = HashSet::new();
        for (name, _) in &columns {
            if !seen.insert(name.as_str()) {
                return Err(DatabaseError::relation(format!(
                    "duplicate column name '{}' in table '{}'",
                    name, table_name
                )));
            }
        }

        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(position, (name, data_type))| ColumnSchema::new(name, data_type, position))
            .collect();
        Ok(Self {
            table_name,
            columns,
        })
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|col| col.name == name)
    }

    pub fn require_column(&self, name: &str) -> Result<&ColumnSchema, DatabaseError> {
        self.get_column(name).ok_or_else(|| {
            DatabaseError::relation(format!(
                "unknown column '{}' in table '{}'",
                name, self.table_name
            ))
        })
    }

    /// Get all column names in order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|col| col.name.clone()).collect()
    }

    pub fn column_attributes(&self) -> Vec<ColumnAttribute> {
        self.columns.iter().map(|col| col.attribute).collect()
    }

    /// Check that `row` carries a correctly typed value for every column and
    /// return the values in column order. Unknown keys are ignored.
    pub fn validate_row<'r>(&self, row: &'r ValueDict) -> Result<Vec<&'r Value>, DatabaseError> {
        self.columns
            .iter()
            .map(|column| {
                let value = row.get(&column.name).ok_or_else(|| {
                    DatabaseError::validation(format!(
                        "missing value for column '{}' of table '{}'",
                        column.name, self.table_name
                    ))
                })?;

                if value.data_type() != column.data_type() {
                    return Err(DatabaseError::validation(format!(
                        "value {} is not compatible with column '{}' of type {}",
                        value,
                        column.name,
                        column.data_type()
                    )));
                }
                if let Value::Text(s) = value {
                    if s.len() > u16::MAX as usize {
                        return Err(DatabaseError::validation(format!(
                            "text of {} bytes in column '{}' exceeds {} bytes",
                            s.len(),
                            column.name,
                            u16::MAX
                        )));
                    }
                }
                Ok(value)
            })
            .collect()
    }
}
