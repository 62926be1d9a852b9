//! The fixed-layout record at offset 0, identifying the volume and locating
//! every other region.
//!
//! Mirrors the way `mkfs/src/ext2.rs`'s `Superblock`/`BlockGroupDescriptor`
//! read and write themselves: a `#[repr(C, packed)]` struct reinterpreted as
//! a raw byte slice, except here every multi-byte field is round-tripped
//! through explicit little-endian byte arrays so the on-disk format does not
//! depend on the host's endianness.

use crate::error::{FurgfsError, Result};
use crate::util::ceil_division;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

/// Size in bytes of the on-disk superblock record.
pub const HEADER_SIZE: u64 = 128;
/// Default block size used by `format` when the caller does not override it.
pub const DEFAULT_BLOCK_SIZE: u32 = 1024;
/// Number of directory entry slots per directory block (`1024 / 64`).
pub const ENTRIES_PER_BLOCK: usize = 16;
/// Size in bytes of one directory entry record.
pub const ENTRY_SIZE: u64 = 64;

/// Minimum accepted volume size.
pub const MIN_VOLUME_SIZE: u64 = 1024 * 1024;
/// Maximum accepted volume size.
pub const MAX_VOLUME_SIZE: u64 = 10_000 * 1024 * 1024;

/// The signature identifying a furgfs volume, as it appears at superblock
/// offset 64, before 25 zero bytes padding the field to 32 bytes.
pub const SIGNATURE: &[u8; 7] = b"FURGfs3";
/// Offset of the signature field within the superblock.
const SIGNATURE_OFFSET: usize = 64;
/// Size of the signature field, including its zero padding.
const SIGNATURE_FIELD_LEN: usize = 32;

/// In-memory representation of the 128-byte superblock record.
#[derive(Clone, Copy, Debug)]
pub struct Superblock {
    /// Size in bytes of the superblock record itself (always [`HEADER_SIZE`]).
    pub header_size: u32,
    /// Size in bytes of one block.
    pub block_size: u32,
    /// Total size in bytes of the backing file.
    pub total_size: u64,
    /// Byte offset of the start of the chain table.
    pub fat_start: u64,
    /// Byte offset of the root directory block.
    pub root_start: u64,
    /// Byte offset of the start of the data region.
    pub data_start: u64,
    /// Total number of blocks represented in the chain table (including the
    /// reserved block 0).
    pub total_blocks: u32,
    /// Free-block counter. Always written zero; see the Open Question in
    /// DESIGN.md. Never trust its on-disk value.
    pub free_blocks: u32,
}

impl Superblock {
    /// Computes the layout for a volume of `total_size` bytes with the given
    /// `block_size`, per the formula:
    ///
    /// `total_blocks = (T - H) / B`, `fat_blocks = ceil(total_blocks*4 / B)`,
    /// `root_start = fat_start + fat_blocks*B`, `data_start = root_start + B`.
    pub fn compute(total_size: u64, block_size: u32) -> Self {
        let b = block_size as u64;
        let total_blocks = ((total_size - HEADER_SIZE) / b) as u32;
        let fat_start = HEADER_SIZE;
        let fat_blocks = ceil_division(total_blocks as u64 * 4, b);
        let root_start = fat_start + fat_blocks * b;
        let data_start = root_start + b;

        Self {
            header_size: HEADER_SIZE as u32,
            block_size,
            total_size,
            fat_start,
            root_start,
            data_start,
            total_blocks,
            free_blocks: 0,
        }
    }

    /// Serializes the superblock into its 128-byte on-disk record.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];

        buf[0..4].copy_from_slice(&self.header_size.to_le_bytes());
        buf[4..8].copy_from_slice(&self.block_size.to_le_bytes());
        buf[8..16].copy_from_slice(&self.total_size.to_le_bytes());
        buf[16..24].copy_from_slice(&self.fat_start.to_le_bytes());
        buf[24..32].copy_from_slice(&self.root_start.to_le_bytes());
        buf[32..40].copy_from_slice(&self.data_start.to_le_bytes());
        buf[40..44].copy_from_slice(&self.total_blocks.to_le_bytes());
        buf[44..48].copy_from_slice(&self.free_blocks.to_le_bytes());
        // 48..64 reserved, left zero.
        buf[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE.len()].copy_from_slice(SIGNATURE);
        // remainder of the signature field, and the trailing reserved field,
        // are left zero.

        buf
    }

    /// Decodes a superblock from a 128-byte record, validating the
    /// signature. A mismatch between the recorded total size and the actual
    /// file length is tolerated (the caller may warn, but it is not fatal).
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE as usize {
            return Err(FurgfsError::InvalidVolume("short header".into()));
        }
        let sig_field = &buf[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_FIELD_LEN];
        if &sig_field[..SIGNATURE.len()] != SIGNATURE.as_slice() {
            return Err(FurgfsError::InvalidVolume("bad signature".into()));
        }

        let header_size = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let block_size = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        let total_size = u64::from_le_bytes(buf[8..16].try_into().unwrap());
        let fat_start = u64::from_le_bytes(buf[16..24].try_into().unwrap());
        let root_start = u64::from_le_bytes(buf[24..32].try_into().unwrap());
        let data_start = u64::from_le_bytes(buf[32..40].try_into().unwrap());
        let total_blocks = u32::from_le_bytes(buf[40..44].try_into().unwrap());
        let free_blocks = u32::from_le_bytes(buf[44..48].try_into().unwrap());

        Ok(Self {
            header_size,
            block_size,
            total_size,
            fat_start,
            root_start,
            data_start,
            total_blocks,
            free_blocks,
        })
    }

    /// Writes a brand-new volume: the superblock record, a zeroed chain
    /// table with block 0 set to the terminator/reserved value, a zeroed
    /// root directory block, and a zero-filled data region.
    ///
    /// Rejects sizes outside `[1 MB, 10000 MB]`.
    pub fn format(file: &mut File, total_size: u64, block_size: u32) -> Result<Self> {
        if !(MIN_VOLUME_SIZE..=MAX_VOLUME_SIZE).contains(&total_size) {
            return Err(FurgfsError::InvalidSize);
        }

        let sb = Self::compute(total_size, block_size);

        file.seek(SeekFrom::Start(0))?;
        file.write_all(&sb.to_bytes())?;

        // Chain table: all free (zero) except block 0, reserved.
        let fat_bytes = sb.total_blocks as u64 * 4;
        let mut fat = vec![0u8; fat_bytes as usize];
        if sb.total_blocks > 0 {
            fat[0..4].copy_from_slice(&1u32.to_le_bytes());
        }
        file.seek(SeekFrom::Start(sb.fat_start))?;
        file.write_all(&fat)?;
        // Pad the rest of the last FAT block to keep the region block-aligned.
        let fat_blocks_bytes = sb.root_start - sb.fat_start;
        if fat_blocks_bytes > fat_bytes {
            let pad = vec![0u8; (fat_blocks_bytes - fat_bytes) as usize];
            file.write_all(&pad)?;
        }

        // Root directory block, zeroed.
        file.seek(SeekFrom::Start(sb.root_start))?;
        file.write_all(&vec![0u8; block_size as usize])?;

        // Data region, zero-filled.
        let data_len = sb.total_size - sb.data_start;
        file.seek(SeekFrom::Start(sb.data_start))?;
        write_zeroes(file, data_len)?;

        file.flush()?;
        Ok(sb)
    }

    /// Opens an existing volume file read/write, reads and decodes its
    /// superblock, and validates it.
    pub fn load(file: &mut File) -> Result<Self> {
        let actual_len = file.metadata()?.len();
        if actual_len < HEADER_SIZE {
            return Err(FurgfsError::InvalidVolume("file too short".into()));
        }

        let mut buf = [0u8; HEADER_SIZE as usize];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut buf)?;

        let sb = Self::from_bytes(&buf)?;
        // A mismatch between recorded and actual size is a warning, not
        // fatal (spec §4.2): the caller may still read/write every block the
        // superblock describes, and the original `furgfs3.py::_load_filesystem`
        // only prints a warning and continues. `actual_len` is intentionally
        // unused beyond the header-length check above.
        let _ = actual_len;

        Ok(sb)
    }
}

/// Writes `len` zero bytes at the file's current position, in chunks, so
/// formatting a large volume doesn't require a multi-megabyte buffer.
fn write_zeroes(file: &mut File, len: u64) -> Result<()> {
    const CHUNK: usize = 64 * 1024;
    let chunk = vec![0u8; CHUNK];

    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(CHUNK as u64) as usize;
        file.write_all(&chunk[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn layout_matches_one_megabyte_example() {
        let sb = Superblock::compute(1024 * 1024, 1024);
        assert_eq!(sb.total_blocks, 1023);
        assert_eq!(sb.fat_start, 128);
        assert_eq!(sb.root_start, 4224);
        assert_eq!(sb.data_start, 5248);
    }

    #[test]
    fn round_trip_bytes() {
        let sb = Superblock::compute(1024 * 1024, 1024);
        let buf = sb.to_bytes();
        let decoded = Superblock::from_bytes(&buf).unwrap();
        assert_eq!(decoded.total_blocks, sb.total_blocks);
        assert_eq!(decoded.data_start, sb.data_start);
        assert_eq!(decoded.block_size, sb.block_size);
    }

    #[test]
    fn rejects_bad_signature() {
        let sb = Superblock::compute(1024 * 1024, 1024);
        let mut buf = sb.to_bytes();
        buf[64] = 0;
        assert!(Superblock::from_bytes(&buf).is_err());
    }
}
