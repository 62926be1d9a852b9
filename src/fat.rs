//! The allocation table ("chain table"): a flat array of 32-bit entries, one
//! per block, encoding free/occupied state and linked chains.
//!
//! Persistence follows the same shape as `BlockGroupDescriptor::write` in
//! `mkfs/src/ext2.rs`: seek to a known offset, write the whole structure,
//! flush.

use crate::error::{FurgfsError, Result};
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

/// Marks a block as free.
pub const FREE: u32 = 0;
/// Marks a block as in-use and the terminator of its chain (also the
/// reserved marker for block 0).
pub const END: u32 = 1;

/// In-memory chain table, loaded in full at mount time and rewritten in full
/// after every mutation.
pub struct ChainTable {
    entries: Vec<u32>,
    fat_start: u64,
}

impl ChainTable {
    /// Loads the chain table from `file`, starting at `fat_start`, for a
    /// volume with `total_blocks` entries.
    pub fn load(file: &mut File, fat_start: u64, total_blocks: u32) -> Result<Self> {
        let mut buf = vec![0u8; total_blocks as usize * 4];
        file.seek(SeekFrom::Start(fat_start))?;
        std::io::Read::read_exact(file, &mut buf)?;

        let entries = buf
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();

        Ok(Self { entries, fat_start })
    }

    /// Number of entries (equal to the volume's total block count).
    pub fn len(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Reads the raw chain-table value of block `index`.
    pub fn get(&self, index: u32) -> u32 {
        self.entries[index as usize]
    }

    /// Rewrites every entry to `file` at `fat_start`, then flushes.
    pub fn update(&self, file: &mut File) -> Result<()> {
        let mut buf = Vec::with_capacity(self.entries.len() * 4);
        for e in &self.entries {
            buf.extend_from_slice(&e.to_le_bytes());
        }

        file.seek(SeekFrom::Start(self.fat_start))?;
        file.write_all(&buf)?;
        file.flush()?;
        Ok(())
    }

    /// First-fit scan for the lowest index whose entry is free. Block 0 is
    /// never considered (it is the permanent root/reserved marker).
    pub fn find_free(&self) -> Option<u32> {
        self.entries
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, &v)| v == FREE)
            .map(|(i, _)| i as u32)
    }

    /// Atomically acquires `n` blocks and links them into a single chain, in
    /// the order they were found. On failure before the `n`th block, every
    /// block acquired during this call is rolled back to free and
    /// [`FurgfsError::NoSpace`] is returned.
    pub fn allocate_chain(&mut self, n: u32) -> Result<Vec<u32>> {
        let mut acquired = Vec::with_capacity(n as usize);

        for _ in 0..n {
            match self.find_free() {
                Some(idx) => {
                    self.entries[idx as usize] = END;
                    acquired.push(idx);
                }
                None => {
                    for idx in &acquired {
                        self.entries[*idx as usize] = FREE;
                    }
                    return Err(FurgfsError::NoSpace);
                }
            }
        }

        for window in 0..acquired.len().saturating_sub(1) {
            let cur = acquired[window];
            let next = acquired[window + 1];
            self.entries[cur as usize] = next;
        }
        // The last block keeps its END marker.

        Ok(acquired)
    }

    /// Walks the chain starting at `head`, freeing every block in it.
    /// Stops once the next pointer is `FREE` or `END`.
    pub fn free_chain(&mut self, head: u32) {
        let mut current = head;
        loop {
            let next = self.entries[current as usize];
            self.entries[current as usize] = FREE;
            if next == FREE || next == END {
                break;
            }
            current = next;
        }
    }

    /// Number of entries currently free (excludes block 0, which is never
    /// free).
    pub fn free_count(&self) -> u32 {
        self.entries.iter().filter(|&&v| v == FREE).count() as u32
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn table(n: usize) -> ChainTable {
        let mut entries = vec![FREE; n];
        if n > 0 {
            entries[0] = END;
        }
        ChainTable {
            entries,
            fat_start: 0,
        }
    }

    #[test]
    fn allocate_single_block() {
        let mut t = table(10);
        let chain = t.allocate_chain(1).unwrap();
        assert_eq!(chain, vec![1]);
        assert_eq!(t.get(1), END);
    }

    #[test]
    fn allocate_links_chain_in_order() {
        let mut t = table(10);
        let chain = t.allocate_chain(3).unwrap();
        assert_eq!(chain, vec![1, 2, 3]);
        assert_eq!(t.get(1), 2);
        assert_eq!(t.get(2), 3);
        assert_eq!(t.get(3), END);
    }

    #[test]
    fn allocate_rolls_back_on_no_space() {
        let mut t = table(3); // indices 0 (reserved), 1, 2 -> only 2 free
        let err = t.allocate_chain(3).unwrap_err();
        assert!(matches!(err, FurgfsError::NoSpace));
        assert_eq!(t.get(1), FREE);
        assert_eq!(t.get(2), FREE);
    }

    #[test]
    fn free_chain_walks_to_terminator() {
        let mut t = table(10);
        let chain = t.allocate_chain(3).unwrap();
        t.free_chain(chain[0]);
        for idx in chain {
            assert_eq!(t.get(idx), FREE);
        }
    }

    #[test]
    fn lowest_index_first() {
        let mut t = table(10);
        t.entries[1] = END; // occupy block 1 out of band
        let chain = t.allocate_chain(1).unwrap();
        assert_eq!(chain, vec![2]);
    }
}
