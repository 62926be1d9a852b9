//! Directory engine: creates subdirectories, navigates, enumerates,
//! renames, and removes entries.
//!
//! A directory block is just 16 fixed-size [`DirEntry`] slots; reading one
//! means reading the whole block once and chunking it, the same shape as
//! `fill_bitmap` in `mkfs/src/ext2.rs` reads/writes a block-sized buffer in
//! one I/O call rather than touching the device entry-by-entry.

use crate::entry::{DirEntry, EntryType};
use crate::error::{FurgfsError, Result};
use crate::superblock::{ENTRIES_PER_BLOCK, ENTRY_SIZE};
use crate::volume::Volume;

/// A directory entry as returned by [`Volume::list`], with its recursive
/// size attached when requested.
#[derive(Clone, Debug)]
pub struct ListedEntry {
    pub entry: DirEntry,
    pub calculated_size: Option<u64>,
}

impl Volume {
    /// Reads all 16 slots of `block`, decoding and validating each. Invalid
    /// or unused slots are skipped, not reported as errors.
    fn read_slots(&mut self, block: u32) -> Result<Vec<(usize, DirEntry)>> {
        let raw = self.block_io().read_block(block)?;
        let total_blocks = self.sb.total_blocks;

        let mut out = Vec::new();
        for slot in 0..ENTRIES_PER_BLOCK {
            let start = slot * ENTRY_SIZE as usize;
            let end = start + ENTRY_SIZE as usize;
            if let Some(entry) = DirEntry::from_bytes(&raw[start..end], total_blocks) {
                out.push((slot, entry));
            }
        }
        Ok(out)
    }

    /// Overwrites a single 64-byte slot within `block`, leaving every other
    /// slot untouched.
    pub(crate) fn write_slot(&mut self, block: u32, slot: usize, bytes: &[u8]) -> Result<()> {
        let mut raw = self.block_io().read_block(block)?;
        let start = slot * ENTRY_SIZE as usize;
        raw[start..start + ENTRY_SIZE as usize].copy_from_slice(bytes);
        self.block_io().write_block(block, &raw)
    }

    pub(crate) fn clear_slot(&mut self, block: u32, slot: usize) -> Result<()> {
        self.write_slot(block, slot, &[0u8; ENTRY_SIZE as usize])
    }

    fn find_entry(&mut self, block: u32, name: &str) -> Result<Option<(usize, DirEntry)>> {
        Ok(self
            .read_slots(block)?
            .into_iter()
            .find(|(_, e)| e.name == name))
    }

    /// Finds the first slot in `block` whose first byte is zero, per
    /// spec.md §4.4's literal definition of "free slot" — independent of
    /// whether a non-zero slot actually decodes as a valid entry, so a
    /// corrupted-but-nonzero record is never mistaken for free space.
    fn find_free_slot(&mut self, block: u32) -> Result<Option<usize>> {
        let raw = self.block_io().read_block(block)?;
        Ok((0..ENTRIES_PER_BLOCK).find(|&slot| raw[slot * ENTRY_SIZE as usize] == 0))
    }

    /// True if every slot in `block` has a zero first byte, per the same
    /// literal "first byte zero" definition `find_free_slot` uses.
    fn block_is_empty(&mut self, block: u32) -> Result<bool> {
        let raw = self.block_io().read_block(block)?;
        Ok((0..ENTRIES_PER_BLOCK).all(|slot| raw[slot * ENTRY_SIZE as usize] == 0))
    }

    /// Writes `entry` into `block`, choosing the first free slot. Fails with
    /// [`FurgfsError::DirectoryFull`] if none is free.
    pub(crate) fn write_entry(&mut self, block: u32, entry: &DirEntry) -> Result<usize> {
        let slot = self
            .find_free_slot(block)?
            .ok_or(FurgfsError::DirectoryFull)?;
        self.write_slot(block, slot, &entry.to_bytes())?;
        Ok(slot)
    }

    /// Sums file sizes recursively under the subtree rooted at directory
    /// block `block`. Recursion depth is bounded only by how deep the
    /// directory tree actually is.
    fn subtree_size(&mut self, block: u32) -> Result<u64> {
        let mut total = 0u64;
        for (_, entry) in self.read_slots(block)? {
            match entry.entry_type {
                EntryType::File => total += entry.size as u64,
                EntryType::Directory => total += self.subtree_size(entry.start_block)?,
            }
        }
        Ok(total)
    }

    /// Re-walks from the root through `path_components`, resolving the
    /// block index of the current directory. Directory blocks carry no
    /// back-link, so this is how `..` and any other resync is done.
    fn resolve_path(&mut self) -> Result<u32> {
        let mut block = 0u32;
        let components = self.path_components.clone();
        for comp in &components {
            let (_, entry) = self
                .find_entry(block, comp)?
                .ok_or_else(|| FurgfsError::NotFound(comp.clone()))?;
            block = entry.start_block;
        }
        Ok(block)
    }

    /// Lists the entries of the current directory. When `recursive_sizes`
    /// is set, each subdirectory entry carries the sum of file sizes in its
    /// subtree as `calculated_size`.
    pub fn list(&mut self, recursive_sizes: bool) -> Result<Vec<ListedEntry>> {
        let slots = self.read_slots(self.current_block)?;
        let mut out = Vec::with_capacity(slots.len());
        for (_, entry) in slots {
            let calculated_size = if recursive_sizes && entry.entry_type == EntryType::Directory {
                Some(self.subtree_size(entry.start_block)?)
            } else {
                None
            };
            out.push(ListedEntry {
                entry,
                calculated_size,
            });
        }
        Ok(out)
    }

    /// Creates a subdirectory named `name` in the current directory:
    /// allocates one block, zero-fills it, and records a type-1 entry.
    pub fn create_directory(&mut self, name: &str) -> Result<()> {
        if self.find_entry(self.current_block, name)?.is_some() {
            return Err(FurgfsError::AlreadyExists(name.to_owned()));
        }

        let chain = self.fat.allocate_chain(1)?;
        let block = chain[0];

        let zeroed = vec![0u8; self.sb.block_size as usize];
        if let Err(e) = self.block_io().write_block(block, &zeroed) {
            self.fat.free_chain(block);
            return Err(e);
        }

        let entry = match DirEntry::new(name, 0, block, EntryType::Directory) {
            Ok(e) => e,
            Err(e) => {
                self.fat.free_chain(block);
                return Err(e);
            }
        };
        if let Err(e) = self.write_entry(self.current_block, &entry) {
            self.fat.free_chain(block);
            return Err(e);
        }

        self.persist_fat()
    }

    /// Changes the current directory to `name`, or pops one level for
    /// `".."`. `".."` at the root is an error, not a no-op: the original
    /// `furgfs3.py::change_directory` rejects it ("Já está na raiz") rather
    /// than silently succeeding.
    pub fn change_directory(&mut self, name: &str) -> Result<()> {
        if name == ".." {
            if self.path_components.is_empty() {
                return Err(FurgfsError::NotFound("..".to_owned()));
            }
            self.path_components.pop();
            self.current_block = self.resolve_path()?;
            return Ok(());
        }

        let (_, entry) = self
            .find_entry(self.current_block, name)?
            .ok_or_else(|| FurgfsError::NotFound(name.to_owned()))?;
        if entry.entry_type != EntryType::Directory {
            return Err(FurgfsError::WrongType(name.to_owned()));
        }

        self.path_components.push(name.to_owned());
        self.current_block = entry.start_block;
        Ok(())
    }

    /// Removes an empty, unprotected subdirectory of the current directory.
    pub fn remove_directory(&mut self, name: &str) -> Result<()> {
        let (slot, entry) = self
            .find_entry(self.current_block, name)?
            .ok_or_else(|| FurgfsError::NotFound(name.to_owned()))?;
        if entry.entry_type != EntryType::Directory {
            return Err(FurgfsError::WrongType(name.to_owned()));
        }
        if entry.protected {
            return Err(FurgfsError::Protected(name.to_owned()));
        }
        if !self.block_is_empty(entry.start_block)? {
            return Err(FurgfsError::NotEmpty(name.to_owned()));
        }

        self.fat.free_chain(entry.start_block);
        self.clear_slot(self.current_block, slot)?;
        self.persist_fat()
    }

    /// Renames `old` to `new` within the current directory. `expected_type`
    /// guards against renaming a file as if it were a directory or vice
    /// versa.
    pub(crate) fn rename_entry(
        &mut self,
        old: &str,
        new: &str,
        expected_type: EntryType,
    ) -> Result<()> {
        if new.is_empty() || new.as_bytes().len() > crate::entry::MAX_NAME_LEN {
            return Err(FurgfsError::NameTooLong);
        }

        let (slot, mut entry) = self
            .find_entry(self.current_block, old)?
            .ok_or_else(|| FurgfsError::NotFound(old.to_owned()))?;
        if entry.entry_type != expected_type {
            return Err(FurgfsError::WrongType(old.to_owned()));
        }
        if entry.protected {
            return Err(FurgfsError::Protected(old.to_owned()));
        }
        // Collision check runs against the directory as it stood before this
        // rename (matching the original `furgfs3.py::_rename_item`, which
        // reads entries before mutating), so it still sees `old`'s own name
        // and a rename to the same name collides rather than succeeding as a
        // no-op.
        if self.find_entry(self.current_block, new)?.is_some() {
            return Err(FurgfsError::AlreadyExists(new.to_owned()));
        }

        entry.name = new.to_owned();
        self.write_slot(self.current_block, slot, &entry.to_bytes())
    }

    /// Flips the protected bit of `name` (file or directory) in the current
    /// directory.
    pub fn toggle_protection(&mut self, name: &str) -> Result<()> {
        let (slot, mut entry) = self
            .find_entry(self.current_block, name)?
            .ok_or_else(|| FurgfsError::NotFound(name.to_owned()))?;
        entry.protected = !entry.protected;
        self.write_slot(self.current_block, slot, &entry.to_bytes())
    }

    /// Renames a file entry. Rejects a directory named `old`.
    pub fn rename_file(&mut self, old: &str, new: &str) -> Result<()> {
        self.rename_entry(old, new, EntryType::File)
    }

    /// Renames a subdirectory entry. Rejects a file named `old`.
    pub fn rename_directory(&mut self, old: &str, new: &str) -> Result<()> {
        self.rename_entry(old, new, EntryType::Directory)
    }

    /// Looks up `name` in the current directory without requiring a
    /// specific type; used internally by the file engine.
    pub(crate) fn lookup(&mut self, name: &str) -> Result<Option<(usize, DirEntry)>> {
        self.find_entry(self.current_block, name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::env;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let mut p = env::temp_dir();
        p.push(format!("furgfs-dirtest-{}-{}", std::process::id(), name));
        p
    }

    #[test]
    fn create_enter_list_and_remove_directory() {
        let path = temp_path("mkdir-basic");
        let _ = std::fs::remove_file(&path);
        let mut vol = Volume::format(&path, 1).unwrap();

        vol.create_directory("d").unwrap();
        let listed = vol.list(false).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].entry.name, "d");
        assert_eq!(listed[0].entry.entry_type, EntryType::Directory);

        vol.change_directory("d").unwrap();
        assert_eq!(vol.current_path(), "/d");
        assert!(vol.list(false).unwrap().is_empty());

        vol.change_directory("..").unwrap();
        assert_eq!(vol.current_path(), "/");

        vol.remove_directory("d").unwrap();
        assert!(vol.list(false).unwrap().is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn change_directory_up_from_root_fails() {
        let path = temp_path("cd-up-root");
        let _ = std::fs::remove_file(&path);
        let mut vol = Volume::format(&path, 1).unwrap();

        let err = vol.change_directory("..").unwrap_err();
        assert!(matches!(err, FurgfsError::NotFound(_)));
        assert_eq!(vol.current_path(), "/");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn rename_to_same_name_collides() {
        let path = temp_path("rename-self");
        let _ = std::fs::remove_file(&path);
        let mut vol = Volume::format(&path, 1).unwrap();

        vol.create_file("a.txt", b"hi").unwrap();
        let err = vol.rename_file("a.txt", "a.txt").unwrap_err();
        assert!(matches!(err, FurgfsError::AlreadyExists(_)));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn duplicate_directory_name_rejected() {
        let path = temp_path("mkdir-dup");
        let _ = std::fs::remove_file(&path);
        let mut vol = Volume::format(&path, 1).unwrap();

        vol.create_directory("d").unwrap();
        let err = vol.create_directory("d").unwrap_err();
        assert!(matches!(err, FurgfsError::AlreadyExists(_)));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn directory_full_after_seventeenth_entry() {
        let path = temp_path("dirfull");
        let _ = std::fs::remove_file(&path);
        let mut vol = Volume::format(&path, 1).unwrap();

        for i in 0..16 {
            vol.create_directory(&format!("d{i}")).unwrap();
        }
        let err = vol.create_directory("d16").unwrap_err();
        assert!(matches!(err, FurgfsError::DirectoryFull));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn remove_nonempty_directory_fails() {
        let path = temp_path("rmdir-nonempty");
        let _ = std::fs::remove_file(&path);
        let mut vol = Volume::format(&path, 1).unwrap();

        vol.create_directory("d").unwrap();
        vol.change_directory("d").unwrap();
        vol.create_directory("inner").unwrap();
        vol.change_directory("..").unwrap();

        let err = vol.remove_directory("d").unwrap_err();
        assert!(matches!(err, FurgfsError::NotEmpty(_)));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn recursive_size_sums_nested_file() {
        let path = temp_path("recursive-size");
        let _ = std::fs::remove_file(&path);
        let mut vol = Volume::format(&path, 1).unwrap();

        vol.create_directory("d1").unwrap();
        vol.change_directory("d1").unwrap();
        vol.create_directory("d2").unwrap();
        vol.change_directory("d2").unwrap();
        vol.create_file("x", &vec![0u8; 100]).unwrap();
        vol.change_directory("..").unwrap();
        vol.change_directory("..").unwrap();

        let listed = vol.list(true).unwrap();
        let d1 = listed.iter().find(|l| l.entry.name == "d1").unwrap();
        assert_eq!(d1.calculated_size, Some(100));

        let _ = std::fs::remove_file(&path);
    }
}
