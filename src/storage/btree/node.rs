use crate::{
    storage::{
        btree::key::{KeyProfile, KeyValue},
        heap_file::HeapFile,
    },
    types::{
        BLOCK_SZ, BlockId, RecordId, SLOT_HEADER_SIZE,
        error::DatabaseError,
        handle::Handle,
        page::SlottedPage,
    },
};

const HEADER_RECORD_ID: RecordId = 1;
const HEADER_SIZE: usize = 4;
const CHILD_SIZE: usize = 4;

/// Result of inserting into a subtree whose root had to split.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    pub sibling: BlockId,
    pub boundary: KeyValue,
}

/// Leaf level: sorted keys with the handle of the row they came from, plus
/// the block of the next leaf to the right.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode {
    pub block_id: BlockId,
    pub entries: Vec<(KeyValue, Handle)>,
    pub next_leaf: Option<BlockId>,
}

/// Interior level: `first_child` holds keys below the first boundary, and the
/// child paired with boundary `k` holds keys `>= k` up to the next boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct InteriorNode {
    pub block_id: BlockId,
    pub first_child: BlockId,
    pub entries: Vec<(KeyValue, BlockId)>,
}

/// One B-tree node, persisted as a single slotted page. Record 1 is the node
/// header (next leaf or first child, 0 meaning none) and records 2.. are the
/// entries in key order.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(LeafNode),
    Interior(InteriorNode),
}

impl Node {
    pub fn load(
        file: &HeapFile,
        block_id: BlockId,
        is_leaf: bool,
        profile: &KeyProfile,
    ) -> Result<Self, DatabaseError> {
        let page = file.get(block_id)?;
        let mut records = page.ids().into_iter();
        let header = match records.next() {
            Some(HEADER_RECORD_ID) => read_u32(&page, HEADER_RECORD_ID)?,
            _ => return Err(corrupted(block_id, "node header missing")),
        };

        if is_leaf {
            let entries = records
                .map(|record_id| -> Result<(KeyValue, Handle), DatabaseError> {
                    let bytes = record(&page, record_id)?;
                    let mut cursor = 0;
                    let key = profile.decode(bytes, &mut cursor)?;
                    let tail: &[u8; Handle::ENCODED_SIZE] = bytes[cursor..]
                        .try_into()
                        .map_err(|_| corrupted(block_id, "bad leaf entry"))?;
                    Ok((key, Handle::from_bytes(tail)))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Node::Leaf(LeafNode {
                block_id,
                entries,
                next_leaf: (header != 0).then_some(header),
            }))
        } else {
            let entries = records
                .map(|record_id| -> Result<(KeyValue, BlockId), DatabaseError> {
                    let bytes = record(&page, record_id)?;
                    let mut cursor = 0;
                    let key = profile.decode(bytes, &mut cursor)?;
                    let tail: [u8; CHILD_SIZE] = bytes[cursor..]
                        .try_into()
                        .map_err(|_| corrupted(block_id, "bad interior entry"))?;
                    Ok((key, u32::from_le_bytes(tail)))
                })
                .collect::<Result<Vec<_>, _>>()?;
            if header == 0 {
                return Err(corrupted(block_id, "interior node without first child"));
            }
            Ok(Node::Interior(InteriorNode {
                block_id,
                first_child: header,
                entries,
            }))
        }
    }

    pub fn save(&self, file: &mut HeapFile, profile: &KeyProfile) -> Result<(), DatabaseError> {
        match self {
            Node::Leaf(leaf) => leaf.save(file, profile),
            Node::Interior(interior) => interior.save(file, profile),
        }
    }

    pub fn block_id(&self) -> BlockId {
        match self {
            Node::Leaf(leaf) => leaf.block_id,
            Node::Interior(interior) => interior.block_id,
        }
    }

    /// Bytes the node would occupy once written as a slotted page.
    pub fn encoded_size(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.encoded_size(),
            Node::Interior(interior) => interior.encoded_size(),
        }
    }
}

/// Page usage of a node whose entries carry `tail` bytes after the key.
fn page_usage<'k>(keys: impl Iterator<Item = &'k KeyValue>, tail: usize) -> usize {
    let entries: usize = keys
        .map(|key| KeyProfile::encoded_size(key) + tail + SLOT_HEADER_SIZE)
        .sum();
    SLOT_HEADER_SIZE + HEADER_SIZE + SLOT_HEADER_SIZE + entries
}

/// Write the header record then one record per entry.
fn write_page<I>(
    file: &mut HeapFile,
    block_id: BlockId,
    header: u32,
    entries: I,
) -> Result<(), DatabaseError>
where
    I: Iterator<Item = Vec<u8>>,
{
    let mut page = SlottedPage::new(block_id);
    page.add(&header.to_le_bytes())?;
    for entry in entries {
        page.add(&entry)?;
    }
    file.put(&page)
}

impl LeafNode {
    pub fn new(block_id: BlockId) -> Self {
        Self {
            block_id,
            entries: Vec::new(),
            next_leaf: None,
        }
    }

    pub fn find(&self, key: &KeyValue) -> Option<Handle> {
        self.entries
            .binary_search_by(|(probe, _)| probe.cmp(key))
            .ok()
            .map(|pos| self.entries[pos].1)
    }

    /// Insert in key order. Returns false, leaving the node untouched, when
    /// the key is already present.
    pub fn insert(&mut self, key: KeyValue, handle: Handle) -> bool {
        match self.entries.binary_search_by(|(probe, _)| probe.cmp(&key)) {
            Ok(_) => false,
            Err(pos) => {
                self.entries.insert(pos, (key, handle));
                true
            }
        }
    }

    /// Move the upper half of the entries into a fresh block linked after
    /// this one.
    pub fn split(&mut self, file: &mut HeapFile) -> Result<LeafNode, DatabaseError> {
        let block_id = file.get_new()?.block_id();
        let upper = self.entries.split_off(self.entries.len() / 2);
        let sibling = LeafNode {
            block_id,
            entries: upper,
            next_leaf: self.next_leaf,
        };
        self.next_leaf = Some(block_id);
        Ok(sibling)
    }

    pub fn first_key(&self) -> Option<&KeyValue> {
        self.entries.first().map(|(key, _)| key)
    }

    pub fn encoded_size(&self) -> usize {
        page_usage(self.entries.iter().map(|(key, _)| key), Handle::ENCODED_SIZE)
    }

    pub fn overflows(&self) -> bool {
        self.encoded_size() > BLOCK_SZ
    }

    pub fn save(&self, file: &mut HeapFile, profile: &KeyProfile) -> Result<(), DatabaseError> {
        let entries = self.entries.iter().map(|(key, handle)| {
            let mut buffer = Vec::new();
            profile.encode(key, &mut buffer);
            buffer.extend_from_slice(&handle.to_bytes());
            buffer
        });
        write_page(file, self.block_id, self.next_leaf.unwrap_or(0), entries)
    }
}

impl InteriorNode {
    pub fn new(block_id: BlockId, first_child: BlockId, entries: Vec<(KeyValue, BlockId)>) -> Self {
        Self {
            block_id,
            first_child,
            entries,
        }
    }

    /// Child whose range covers `key`.
    pub fn find_child(&self, key: &KeyValue) -> BlockId {
        match self.entries.partition_point(|(boundary, _)| boundary <= key) {
            0 => self.first_child,
            pos => self.entries[pos - 1].1,
        }
    }

    pub fn insert(&mut self, boundary: KeyValue, child: BlockId) {
        let pos = self.entries.partition_point(|(probe, _)| probe < &boundary);
        self.entries.insert(pos, (boundary, child));
    }

    pub fn encoded_size(&self) -> usize {
        page_usage(self.entries.iter().map(|(key, _)| key), CHILD_SIZE)
    }

    pub fn overflows(&self) -> bool {
        self.encoded_size() > BLOCK_SZ
    }

    pub fn save(&self, file: &mut HeapFile, profile: &KeyProfile) -> Result<(), DatabaseError> {
        let entries = self.entries.iter().map(|(key, child)| {
            let mut buffer = Vec::new();
            profile.encode(key, &mut buffer);
            buffer.extend_from_slice(&child.to_le_bytes());
            buffer
        });
        write_page(file, self.block_id, self.first_child, entries)
    }

    /// Split around the middle entry: its key moves up as the boundary and
    /// its child becomes the sibling's first child.
    pub fn split(&mut self, file: &mut HeapFile) -> Result<(InteriorNode, KeyValue), DatabaseError> {
        let block_id = file.get_new()?.block_id();
        let mut upper = self.entries.split_off(self.entries.len() / 2);
        if upper.is_empty() {
            return Err(corrupted(self.block_id, "cannot split an empty interior node"));
        }
        let (boundary, first_child) = upper.remove(0);
        Ok((InteriorNode::new(block_id, first_child, upper), boundary))
    }
}

fn record(page: &SlottedPage, record_id: RecordId) -> Result<&[u8], DatabaseError> {
    page.get(record_id).ok_or(DatabaseError::InvalidRecordId {
        block_id: page.block_id(),
        record_id,
    })
}

fn read_u32(page: &SlottedPage, record_id: RecordId) -> Result<u32, DatabaseError> {
    let bytes: [u8; 4] = record(page, record_id)?
        .try_into()
        .map_err(|_| corrupted(page.block_id(), "node header must be 4 bytes"))?;
    Ok(u32::from_le_bytes(bytes))
}

fn corrupted(block_id: BlockId, reason: &str) -> DatabaseError {
    DatabaseError::CorruptedBlock {
        block_id,
        reason: reason.to_string(),
    }
}
