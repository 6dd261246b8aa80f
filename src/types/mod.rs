pub mod error;
pub mod handle;
pub mod page;
pub mod row;
pub mod value;

// Common type aliases
pub type BlockId = u32;
pub type RecordId = u16;

// Storage constants
pub const BLOCK_SZ: usize = 4096;
pub const SLOT_HEADER_SIZE: usize = 4; // size (2 bytes) + offset (2 bytes)
pub const CHECKSUM_SIZE: usize = 4; // CRC32 trailer written after every block
pub const STAT_BLOCK_ID: BlockId = 1; // reserved in every index file

/// Largest record a fresh block can hold: block header and one slot removed.
pub const MAX_RECORD_SIZE: usize = BLOCK_SZ - 2 * SLOT_HEADER_SIZE;
