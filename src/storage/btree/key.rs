use crate::{
    storage::relation::DbRelation,
    types::{
        BLOCK_SZ, BlockId,
        error::DatabaseError,
        row::{decode_value, encode_value},
        value::{DataType, Value, ValueDict},
    },
};

/// Key values of one row, ordered like the index's key columns.
pub type KeyValue = Vec<Value>;

/// Largest marshaled key an index stores. Keeps at least three entries per
/// node so that a split always leaves both halves non-empty.
pub const MAX_KEY_SIZE: usize = BLOCK_SZ / 4 - 16;

/// Types of the index's key columns, in key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyProfile {
    columns: Vec<String>,
    types: Vec<DataType>,
}

impl KeyProfile {
    /// Derive the profile from the relation's schema.
    pub fn build(relation: &dyn DbRelation, key_columns: &[String]) -> Result<Self, DatabaseError> {
        if key_columns.is_empty() {
            return Err(DatabaseError::relation("an index needs at least one key column"));
        }
        let types = relation
            .column_attributes(key_columns)?
            .into_iter()
            .map(|attribute| attribute.data_type)
            .collect();
        Ok(Self {
            columns: key_columns.to_vec(),
            types,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn types(&self) -> &[DataType] {
        &self.types
    }

    /// Pull the key out of `key_dict` in key-column order.
    pub fn extract(&self, key_dict: &ValueDict) -> Result<KeyValue, DatabaseError> {
        self.columns
            .iter()
            .zip(&self.types)
            .map(|(column, data_type)| {
                let value = key_dict.get(column).ok_or_else(|| {
                    DatabaseError::validation(format!("missing value for key column '{}'", column))
                })?;
                if value.data_type() != *data_type {
                    return Err(DatabaseError::validation(format!(
                        "value {} is not compatible with key column '{}' of type {}",
                        value, column, data_type
                    )));
                }
                Ok(value.clone())
            })
            .collect()
    }

    /// Refuse keys too large to be stored in a node. `block_id` is the node
    /// the key was headed for.
    pub fn check_size(&self, key: &KeyValue, block_id: BlockId) -> Result<(), DatabaseError> {
        let size = Self::encoded_size(key);
        if size > MAX_KEY_SIZE {
            return Err(DatabaseError::NoRoom {
                block_id,
                needed: size,
                available: MAX_KEY_SIZE,
            });
        }
        Ok(())
    }

    pub fn encode(&self, key: &KeyValue, buffer: &mut Vec<u8>) {
        for value in key {
            encode_value(value, buffer);
        }
    }

    pub fn decode(&self, bytes: &[u8], cursor: &mut usize) -> Result<KeyValue, DatabaseError> {
        self.types
            .iter()
            .map(|&data_type| decode_value(data_type, bytes, cursor))
            .collect()
    }

    pub fn encoded_size(key: &KeyValue) -> usize {
        key.iter().map(Value::marshaled_size).sum()
    }
}

/// Render a key for error messages, e.g. `(150, "x")`.
pub fn format_key(key: &KeyValue) -> String {
    let parts: Vec<String> = key.iter().map(|value| value.to_string()).collect();
    format!("({})", parts.join(", "))
}
