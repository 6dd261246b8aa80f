use thiserror::Error;

use crate::types::{BlockId, RecordId};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {details}")]
    Validation { details: String },

    #[error("Not enough room in block {block_id}: need {needed} bytes, {available} available")]
    NoRoom {
        block_id: BlockId,
        needed: usize,
        available: usize,
    },

    #[error("Duplicate key {key} in unique index '{index}'")]
    DuplicateKey { index: String, key: String },

    #[error("Not supported: {operation}")]
    NotSupported { operation: String },

    #[error("Relation error: {details}")]
    Relation { details: String },

    #[error("Invalid record id {record_id} in block {block_id}")]
    InvalidRecordId {
        block_id: BlockId,
        record_id: RecordId,
    },

    #[error("Corrupted block: block_id={block_id}, reason={reason}")]
    CorruptedBlock { block_id: BlockId, reason: String },

    #[error("Serialization/deserialization error: {details}")]
    Serialization { details: String },

    #[error("File '{name}' is not open")]
    FileClosed { name: String },

    #[error("File '{name}' already exists")]
    FileExists { name: String },

    #[error("{original} (compensation failed: {})", format_failures(.failures))]
    CompensationFailed {
        original: Box<DatabaseError>,
        failures: Vec<DatabaseError>,
    },
}

fn format_failures(failures: &[DatabaseError]) -> String {
    failures
        .iter()
        .map(|failure| failure.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl DatabaseError {
    pub fn validation(details: impl Into<String>) -> Self {
        Self::Validation {
            details: details.into(),
        }
    }

    pub fn relation(details: impl Into<String>) -> Self {
        Self::Relation {
            details: details.into(),
        }
    }

    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
