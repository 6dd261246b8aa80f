use crc32fast::Hasher;

use crate::types::BlockId;

/// CRC32 over the block id and the raw page bytes. Binding the id into the
/// checksum catches a block written at the wrong offset.
pub fn calculate_block_checksum(block_id: BlockId, data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&block_id.to_le_bytes());
    hasher.update(data);
    hasher.finalize()
}

pub fn verify_block_checksum(block_id: BlockId, data: &[u8], expected: u32) -> bool {
    calculate_block_checksum(block_id, data) == expected
}
