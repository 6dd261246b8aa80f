use bincode::{Decode, Encode, config};

use crate::{
    storage::heap_file::HeapFile,
    types::{BlockId, STAT_BLOCK_ID, error::DatabaseError},
};

const STAT_RECORD_ID: u16 = 1;

/// Index metadata kept in the reserved stat block: where the root lives and
/// how many levels the tree has (1 = the root is a leaf).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct BTreeStat {
    pub root_id: BlockId,
    pub height: u32,
}

impl BTreeStat {
    pub fn new(root_id: BlockId, height: u32) -> Self {
        Self { root_id, height }
    }

    pub fn load(file: &HeapFile) -> Result<Self, DatabaseError> {
        let page = file.get(STAT_BLOCK_ID)?;
        let bytes = page
            .get(STAT_RECORD_ID)
            .ok_or_else(|| DatabaseError::CorruptedBlock {
                block_id: STAT_BLOCK_ID,
                reason: format!("index file '{}' has no stat record", file.name()),
            })?;
        let (stat, _) = bincode::decode_from_slice(bytes, config::standard()).map_err(|err| {
            DatabaseError::Serialization {
                details: format!("stat block: {}", err),
            }
        })?;
        Self::check(stat)
    }

    // Block 1 is the stat block itself, so a root lives at block 2 or later.
    fn check(stat: BTreeStat) -> Result<Self, DatabaseError> {
        if stat.height == 0 || stat.root_id <= STAT_BLOCK_ID {
            return Err(DatabaseError::CorruptedBlock {
                block_id: STAT_BLOCK_ID,
                reason: format!(
                    "invalid index stat: root {} at height {}",
                    stat.root_id, stat.height
                ),
            });
        }
        Ok(stat)
    }

    pub fn save(&self, file: &mut HeapFile) -> Result<(), DatabaseError> {
        let bytes = bincode::encode_to_vec(self, config::standard()).map_err(|err| {
            DatabaseError::Serialization {
                details: format!("stat block: {}", err),
            }
        })?;
        let mut page = file.get(STAT_BLOCK_ID)?;
        if page.get(STAT_RECORD_ID).is_some() {
            page.put(STAT_RECORD_ID, &bytes)?;
        } else {
            page.add(&bytes)?;
        }
        file.put(&page)
    }
}
