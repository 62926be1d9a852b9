//! The 64-byte directory entry record and the directory-block framing
//! around it, following the same "struct describes the exact on-disk
//! layout, (de)serialize via explicit byte ranges" approach as
//! [`crate::superblock::Superblock`].

use crate::error::{FurgfsError, Result};
use crate::superblock::ENTRY_SIZE;
use crate::util::get_timestamp;

/// Maximum usable length, in bytes, of an entry's name (the 32-byte field
/// minus one byte so the name can always be distinguished from "unused").
pub const MAX_NAME_LEN: usize = 31;

/// The type of a directory entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntryType {
    File,
    Directory,
}

impl EntryType {
    fn to_u16(self) -> u16 {
        match self {
            EntryType::File => 0,
            EntryType::Directory => 1,
        }
    }

    fn from_u16(v: u16) -> Option<Self> {
        match v {
            0 => Some(EntryType::File),
            1 => Some(EntryType::Directory),
            _ => None,
        }
    }
}

/// A decoded 64-byte directory entry.
#[derive(Clone, Debug)]
pub struct DirEntry {
    pub name: String,
    pub size: u32,
    pub start_block: u32,
    pub timestamp: u32,
    pub protected: bool,
    pub entry_type: EntryType,
}

impl DirEntry {
    /// Builds a new entry for `name`, validating the name's length.
    pub fn new(name: &str, size: u32, start_block: u32, entry_type: EntryType) -> Result<Self> {
        if name.is_empty() || name.as_bytes().len() > MAX_NAME_LEN {
            return Err(FurgfsError::NameTooLong);
        }
        Ok(Self {
            name: name.to_owned(),
            size,
            start_block,
            timestamp: get_timestamp().as_secs() as u32,
            protected: false,
            entry_type,
        })
    }

    /// Serializes the entry into its 64-byte on-disk record.
    pub fn to_bytes(&self) -> [u8; ENTRY_SIZE as usize] {
        let mut buf = [0u8; ENTRY_SIZE as usize];

        let name_bytes = self.name.as_bytes();
        let n = name_bytes.len().min(MAX_NAME_LEN);
        buf[0..n].copy_from_slice(&name_bytes[0..n]);
        // buf[n..32] stays zero (NUL padding).

        buf[32..36].copy_from_slice(&self.size.to_le_bytes());
        buf[36..40].copy_from_slice(&self.start_block.to_le_bytes());
        buf[40..44].copy_from_slice(&self.timestamp.to_le_bytes());
        // 44..48 reserved, zero.
        buf[48..50].copy_from_slice(&(self.protected as u16).to_le_bytes());
        buf[50..52].copy_from_slice(&self.entry_type.to_u16().to_le_bytes());
        // 52..64 reserved, zero.

        buf
    }

    /// Decodes an entry from a 64-byte record, validating it against the
    /// invariants of spec §3/§8 (name printable, `protected`/`entry_type` in
    /// range, `start_block` in bounds, `timestamp` within a positive 32-bit
    /// range). Returns `None` for an unused slot (first byte zero) or a slot
    /// that fails validation (which is skipped by `read_directory` rather
    /// than treated as an error).
    pub fn from_bytes(buf: &[u8], total_blocks: u32) -> Option<Self> {
        if buf.first() == Some(&0) {
            return None;
        }

        let name_raw = &buf[0..32];
        let nul = name_raw.iter().position(|&b| b == 0).unwrap_or(32);
        let name = std::str::from_utf8(&name_raw[..nul]).ok()?;
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
            return None;
        }

        let size = u32::from_le_bytes(buf[32..36].try_into().unwrap());
        let start_block = u32::from_le_bytes(buf[36..40].try_into().unwrap());
        let timestamp = u32::from_le_bytes(buf[40..44].try_into().unwrap());
        let protected = u16::from_le_bytes(buf[48..50].try_into().unwrap());
        let entry_type = u16::from_le_bytes(buf[50..52].try_into().unwrap());

        if protected > 1 {
            return None;
        }
        let entry_type = EntryType::from_u16(entry_type)?;
        if start_block >= total_blocks {
            return None;
        }
        if timestamp > 0x8000_0000 {
            return None;
        }

        Some(Self {
            name: name.to_owned(),
            size,
            start_block,
            timestamp,
            protected: protected == 1,
            entry_type,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let entry = DirEntry::new("a.txt", 6, 1, EntryType::File).unwrap();
        let buf = entry.to_bytes();
        let decoded = DirEntry::from_bytes(&buf, 1024).unwrap();
        assert_eq!(decoded.name, "a.txt");
        assert_eq!(decoded.size, 6);
        assert_eq!(decoded.start_block, 1);
        assert_eq!(decoded.entry_type, EntryType::File);
        assert!(!decoded.protected);
    }

    #[test]
    fn unused_slot_is_none() {
        let buf = [0u8; 64];
        assert!(DirEntry::from_bytes(&buf, 1024).is_none());
    }

    #[test]
    fn name_length_boundary() {
        let ok = "a".repeat(MAX_NAME_LEN);
        assert!(DirEntry::new(&ok, 0, 1, EntryType::File).is_ok());

        let too_long = "a".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            DirEntry::new(&too_long, 0, 1, EntryType::File),
            Err(FurgfsError::NameTooLong)
        ));
    }

    #[test]
    fn out_of_range_start_block_is_rejected() {
        let entry = DirEntry::new("x", 0, 5, EntryType::File).unwrap();
        let buf = entry.to_bytes();
        assert!(DirEntry::from_bytes(&buf, 5).is_none());
    }

    #[test]
    fn out_of_range_timestamp_is_rejected() {
        let mut entry = DirEntry::new("x", 0, 1, EntryType::File).unwrap();
        entry.timestamp = 0xFFFF_FFFF;
        let buf = entry.to_bytes();
        assert!(DirEntry::from_bytes(&buf, 1024).is_none());
    }
}
