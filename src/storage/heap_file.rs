use std::{
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Read, Seek, SeekFrom, Write},
    path::PathBuf,
};

use tracing::debug;

use crate::{
    storage::env::DbEnv,
    types::{BLOCK_SZ, BlockId, CHECKSUM_SIZE, error::DatabaseError, page::SlottedPage},
    utils::hash::{calculate_block_checksum, verify_block_checksum},
};

/// On-disk footprint of one block: the page followed by its CRC32.
const FRAME_SIZE: usize = BLOCK_SZ + CHECKSUM_SIZE;

/// An ordered sequence of slotted pages stored in one file of the
/// environment. Block ids start at 1 and only grow.
#[derive(Debug)]
pub struct HeapFile {
    env: DbEnv,
    name: String,
    path: PathBuf,
    file: Option<File>,
    last: BlockId,
}

impl HeapFile {
    pub fn new(env: &DbEnv, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            env: env.clone(),
            path: env.file_path(&name),
            name,
            file: None,
            last: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn exists(&self) -> bool {
        self.env.file_exists(&self.name)
    }

    /// Create the file with a single empty block. Fails if it already exists.
    pub fn create(&mut self) -> Result<(), DatabaseError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|err| match err.kind() {
                ErrorKind::AlreadyExists => DatabaseError::FileExists {
                    name: self.name.clone(),
                },
                _ => DatabaseError::Io(err),
            })?;
        debug!(file = %self.name, "created block file");
        self.file = Some(file);
        self.last = 0;
        self.get_new()?;
        Ok(())
    }

    /// Close and remove the file.
    pub fn destroy(&mut self) -> Result<(), DatabaseError> {
        self.close();
        fs::remove_file(&self.path)?;
        debug!(file = %self.name, "removed block file");
        Ok(())
    }

    pub fn open(&mut self) -> Result<(), DatabaseError> {
        if self.is_open() {
            return Ok(());
        }
        let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        let file_size = file.metadata()?.len();
        if file_size % FRAME_SIZE as u64 != 0 {
            return Err(DatabaseError::CorruptedBlock {
                block_id: (file_size / FRAME_SIZE as u64) as BlockId + 1,
                reason: format!("file '{}' ends with a partial block", self.name),
            });
        }
        self.last = (file_size / FRAME_SIZE as u64) as BlockId;
        self.file = Some(file);
        debug!(file = %self.name, last = self.last, "opened block file");
        Ok(())
    }

    pub fn close(&mut self) {
        if self.file.take().is_some() {
            debug!(file = %self.name, "closed block file");
        }
    }

    /// Allocate the next block id, persist an empty page for it and return
    /// the page.
    pub fn get_new(&mut self) -> Result<SlottedPage, DatabaseError> {
        let block_id = self.last + 1;
        let page = SlottedPage::new(block_id);
        self.write_block(&page)?;
        self.last = block_id;
        debug!(file = %self.name, block_id, "allocated block");
        Ok(page)
    }

    pub fn get(&self, block_id: BlockId) -> Result<SlottedPage, DatabaseError> {
        let mut file = self.handle()?;
        if block_id == 0 || block_id > self.last {
            return Err(DatabaseError::CorruptedBlock {
                block_id,
                reason: format!("file '{}' has blocks 1..={}", self.name, self.last),
            });
        }
        let mut buffer = vec![0u8; FRAME_SIZE];
        file.seek(SeekFrom::Start(Self::block_offset(block_id)))?;
        file.read_exact(&mut buffer)?;

        let (data, trailer) = buffer.split_at(BLOCK_SZ);
        let checksum = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        if !verify_block_checksum(block_id, data, checksum) {
            return Err(DatabaseError::CorruptedBlock {
                block_id,
                reason: format!("checksum mismatch in file '{}'", self.name),
            });
        }
        SlottedPage::from_bytes(block_id, data)
    }

    /// Write a page back to its block.
    pub fn put(&mut self, page: &SlottedPage) -> Result<(), DatabaseError> {
        self.ensure_open()?;
        if page.block_id() == 0 || page.block_id() > self.last {
            return Err(DatabaseError::CorruptedBlock {
                block_id: page.block_id(),
                reason: format!("block was never allocated in file '{}'", self.name),
            });
        }
        self.write_block(page)
    }

    pub fn block_ids(&self) -> Vec<BlockId> {
        (1..=self.last).collect()
    }

    pub fn last_block_id(&self) -> BlockId {
        self.last
    }

    fn write_block(&mut self, page: &SlottedPage) -> Result<(), DatabaseError> {
        let mut file = self.handle()?;
        let checksum = calculate_block_checksum(page.block_id(), page.as_bytes());
        let mut frame = Vec::with_capacity(FRAME_SIZE);
        frame.extend_from_slice(page.as_bytes());
        frame.extend_from_slice(&checksum.to_le_bytes());

        file.seek(SeekFrom::Start(Self::block_offset(page.block_id())))?;
        file.write_all(&frame)?;
        file.flush()?;
        Ok(())
    }

    pub fn ensure_open(&self) -> Result<(), DatabaseError> {
        self.handle().map(|_| ())
    }

    fn handle(&self) -> Result<&File, DatabaseError> {
        self.file.as_ref().ok_or_else(|| DatabaseError::FileClosed {
            name: self.name.clone(),
        })
    }

    fn block_offset(block_id: BlockId) -> u64 {
        (block_id as u64 - 1) * FRAME_SIZE as u64
    }
}
