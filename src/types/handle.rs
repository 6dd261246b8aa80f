use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{BlockId, RecordId};

/// Stable reference to one row: the block it lives in and its record id
/// within that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle {
    pub block_id: BlockId,
    pub record_id: RecordId,
}

impl Handle {
    pub const ENCODED_SIZE: usize = 6;

    pub fn new(block_id: BlockId, record_id: RecordId) -> Self {
        Self {
            block_id,
            record_id,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::ENCODED_SIZE] {
        let mut buffer = [0u8; Self::ENCODED_SIZE];
        buffer[0..4].copy_from_slice(&self.block_id.to_le_bytes());
        buffer[4..6].copy_from_slice(&self.record_id.to_le_bytes());
        buffer
    }

    pub fn from_bytes(bytes: &[u8; Self::ENCODED_SIZE]) -> Self {
        Self {
            block_id: BlockId::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            record_id: RecordId::from_le_bytes([bytes[4], bytes[5]]),
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.block_id, self.record_id)
    }
}
