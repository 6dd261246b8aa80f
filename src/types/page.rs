use tracing::trace;

use crate::types::{BLOCK_SZ, BlockId, RecordId, SLOT_HEADER_SIZE, error::DatabaseError};

/*
 * Slotted Page Layout (one block, BLOCK_SZ bytes)
 * ┌─────────────────────────────────────────────────────────────────┐
 * │  BLOCK HEADER: num_records(2) | end_free(2)                     │
 * ├─────────────────────────────────────────────────────────────────┤
 * │  SLOT DIRECTORY (grows forward)                                 │
 * │  [slot1: size(2)|offset(2)] [slot2: size(2)|offset(2)] ...      │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                    FREE SPACE                                   │
 * │                    end_free = last free byte                    │
 * ├─────────────────────────────────────────────────────────────────┤
 * │  RECORD DATA (grows backward)                                   │
 * │  [...record N...] ... [...record 2...] [...record 1...]         │
 * └─────────────────────────────────────────────────────────────────┘
 *
 * A slot with size 0 and offset 0 is a tombstone. Record ids are never
 * reused, so num_records only grows.
 */

#[derive(Debug, Clone, PartialEq)]
pub struct SlottedPage {
    block_id: BlockId,
    num_records: u16,
    end_free: u16,
    data: Vec<u8>,
}

impl SlottedPage {
    /// Fresh, empty page for `block_id`.
    pub fn new(block_id: BlockId) -> Self {
        let mut page = Self {
            block_id,
            num_records: 0,
            end_free: (BLOCK_SZ - 1) as u16,
            data: vec![0; BLOCK_SZ],
        };
        page.put_block_header();
        page
    }

    /// Rebuild a page from the raw bytes of a block.
    pub fn from_bytes(block_id: BlockId, bytes: &[u8]) -> Result<Self, DatabaseError> {
        if bytes.len() != BLOCK_SZ {
            return Err(DatabaseError::CorruptedBlock {
                block_id,
                reason: format!("expected {} bytes, got {}", BLOCK_SZ, bytes.len()),
            });
        }

        let num_records = u16::from_le_bytes([bytes[0], bytes[1]]);
        let end_free = u16::from_le_bytes([bytes[2], bytes[3]]);

        if end_free as usize >= BLOCK_SZ {
            return Err(DatabaseError::CorruptedBlock {
                block_id,
                reason: format!("end_free {} outside of block", end_free),
            });
        }
        if (num_records as usize + 1) * SLOT_HEADER_SIZE > end_free as usize + 1 {
            return Err(DatabaseError::CorruptedBlock {
                block_id,
                reason: format!(
                    "slot directory for {} records overlaps record area at {}",
                    num_records, end_free
                ),
            });
        }

        Ok(Self {
            block_id,
            num_records,
            end_free,
            data: bytes.to_vec(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn block_id(&self) -> BlockId {
        self.block_id
    }

    /// Highest record id ever handed out by this page (tombstones included).
    pub fn num_records(&self) -> u16 {
        self.num_records
    }

    pub fn end_free(&self) -> u16 {
        self.end_free
    }

    /// Bytes between the end of the slot directory and the record area.
    pub fn free_space(&self) -> usize {
        (self.end_free as usize + 1) - (self.num_records as usize + 1) * SLOT_HEADER_SIZE
    }

    /// Bytes currently held by live records.
    pub fn live_bytes(&self) -> usize {
        BLOCK_SZ - 1 - self.end_free as usize
    }

    /// Whether a new record of `size` bytes, plus its slot, fits.
    pub fn has_room(&self, size: usize) -> bool {
        size + SLOT_HEADER_SIZE <= self.free_space()
    }

    pub fn add(&mut self, bytes: &[u8]) -> Result<RecordId, DatabaseError> {
        if !self.has_room(bytes.len()) {
            return Err(self.no_room(bytes.len() + SLOT_HEADER_SIZE));
        }

        self.num_records += 1;
        let id = self.num_records;
        let size = bytes.len() as u16;
        self.end_free -= size;
        let loc = self.end_free + 1;
        self.put_block_header();
        self.put_header(id, size, loc);

        let start = loc as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        trace!(block_id = self.block_id, record_id = id, size, "record added");
        Ok(id)
    }

    pub fn get(&self, record_id: RecordId) -> Option<&[u8]> {
        let (size, loc) = self.live_header(record_id)?;
        let start = loc as usize;
        Some(&self.data[start..start + size as usize])
    }

    /// Overwrite a record in place, sliding its neighbours to make or reclaim
    /// room.
    pub fn put(&mut self, record_id: RecordId, bytes: &[u8]) -> Result<(), DatabaseError> {
        let (size, loc) = self
            .live_header(record_id)
            .ok_or(DatabaseError::InvalidRecordId {
                block_id: self.block_id,
                record_id,
            })?;
        let (size, loc) = (size as usize, loc as usize);
        let new_size = bytes.len();

        if new_size > size {
            let extra = new_size - size;
            if extra > self.free_space() {
                return Err(self.no_room(extra));
            }
            self.slide(loc, loc - extra);
            let new_loc = loc - extra;
            self.data[new_loc..new_loc + new_size].copy_from_slice(bytes);
            self.put_header(record_id, new_size as u16, new_loc as u16);
        } else {
            self.data[loc..loc + new_size].copy_from_slice(bytes);
            self.slide(loc + new_size, loc + size);
            self.put_header(record_id, new_size as u16, (loc + size - new_size) as u16);
        }
        trace!(block_id = self.block_id, record_id, size = new_size, "record replaced");
        Ok(())
    }

    pub fn del(&mut self, record_id: RecordId) -> Result<(), DatabaseError> {
        let (size, loc) = self
            .live_header(record_id)
            .ok_or(DatabaseError::InvalidRecordId {
                block_id: self.block_id,
                record_id,
            })?;
        self.put_header(record_id, 0, 0);
        self.slide(loc as usize, loc as usize + size as usize);
        trace!(block_id = self.block_id, record_id, "record deleted");
        Ok(())
    }

    /// Live (non-tombstoned) record ids in ascending order.
    pub fn ids(&self) -> Vec<RecordId> {
        (1..=self.num_records)
            .filter(|&id| self.live_header(id).is_some())
            .collect()
    }

    // Move the record bytes in [end_free + 1, start) so that `start` lands
    // on `end`, then fix up the offset of every live record stored wholly
    // inside that range.
    fn slide(&mut self, start: usize, end: usize) {
        if start == end {
            return;
        }
        let begin = self.end_free as usize + 1;

        if end > start {
            let shift = end - start;
            self.data.copy_within(begin..start, begin + shift);
            self.data[begin..begin + shift].fill(0);
            self.shift_offsets(start, |loc| loc + shift as u16);
            self.end_free += shift as u16;
        } else {
            let shift = start - end;
            self.data.copy_within(begin..start, begin - shift);
            self.shift_offsets(start, |loc| loc - shift as u16);
            self.end_free -= shift as u16;
        }

        self.put_block_header();
    }

    fn shift_offsets(&mut self, start: usize, shift: impl Fn(u16) -> u16) {
        for id in self.ids() {
            let (size, loc) = self.get_header(id);
            if loc as usize + size as usize <= start {
                self.put_header(id, size, shift(loc));
            }
        }
    }

    fn live_header(&self, record_id: RecordId) -> Option<(u16, u16)> {
        if record_id == 0 || record_id > self.num_records {
            return None;
        }
        match self.get_header(record_id) {
            (0, 0) => None,
            header => Some(header),
        }
    }

    fn get_header(&self, record_id: RecordId) -> (u16, u16) {
        let offset = record_id as usize * SLOT_HEADER_SIZE;
        (self.get_n(offset), self.get_n(offset + 2))
    }

    fn put_header(&mut self, record_id: RecordId, size: u16, loc: u16) {
        let offset = record_id as usize * SLOT_HEADER_SIZE;
        self.put_n(offset, size);
        self.put_n(offset + 2, loc);
    }

    fn put_block_header(&mut self) {
        self.put_n(0, self.num_records);
        self.put_n(2, self.end_free);
    }

    fn get_n(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.data[offset], self.data[offset + 1]])
    }

    fn put_n(&mut self, offset: usize, n: u16) {
        self.data[offset..offset + 2].copy_from_slice(&n.to_le_bytes());
    }

    fn no_room(&self, needed: usize) -> DatabaseError {
        DatabaseError::NoRoom {
            block_id: self.block_id,
            needed,
            available: self.free_space(),
        }
    }
}
