//! Reads and writes fixed-size blocks at exact byte offsets within the
//! backing file. Knows only the block size and the superblock-reported
//! region starts; nothing above this layer ever seeks the file directly.

use crate::error::Result;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

/// Translates a block index into its absolute byte offset.
///
/// Block 0 is the root directory, stored just before the data region.
/// Block *n* > 0 lives in the data region at `data_start + (n - 1) *
/// block_size` — the off-by-one documented in spec §4.1/§9: chain index 1
/// is the first data-region block.
pub fn block_offset(index: u32, block_size: u32, root_start: u64, data_start: u64) -> u64 {
    if index == 0 {
        root_start
    } else {
        data_start + (index as u64 - 1) * block_size as u64
    }
}

/// Thin synchronous block I/O layer over the backing file.
pub struct BlockIo<'a> {
    file: &'a mut File,
    block_size: u32,
    root_start: u64,
    data_start: u64,
}

impl<'a> BlockIo<'a> {
    pub fn new(file: &'a mut File, block_size: u32, root_start: u64, data_start: u64) -> Self {
        Self {
            file,
            block_size,
            root_start,
            data_start,
        }
    }

    fn offset(&self, index: u32) -> u64 {
        block_offset(index, self.block_size, self.root_start, self.data_start)
    }

    /// Reads one full block. A short read is an error.
    pub fn read_block(&mut self, index: u32) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.block_size as usize];
        self.file.seek(SeekFrom::Start(self.offset(index)))?;
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Writes `data` to block `index`, padding with zero bytes to a full
    /// block if `data` is shorter than `block_size`.
    pub fn write_block(&mut self, index: u32, data: &[u8]) -> Result<()> {
        debug_assert!(data.len() <= self.block_size as usize);

        self.file.seek(SeekFrom::Start(self.offset(index)))?;
        self.file.write_all(data)?;
        if data.len() < self.block_size as usize {
            let pad = vec![0u8; self.block_size as usize - data.len()];
            self.file.write_all(&pad)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn root_block_addresses_root_start() {
        assert_eq!(block_offset(0, 1024, 4224, 5248), 4224);
    }

    #[test]
    fn data_block_one_addresses_data_start() {
        assert_eq!(block_offset(1, 1024, 4224, 5248), 5248);
    }

    #[test]
    fn data_block_addressing_is_off_by_one() {
        assert_eq!(block_offset(4, 1024, 4224, 5248), 5248 + 3 * 1024);
    }
}
