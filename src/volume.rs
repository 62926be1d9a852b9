//! Volume lifecycle: format a fresh volume, mount an existing one, and the
//! shared low-level plumbing (`impl Volume` blocks in [`crate::dir`] and
//! [`crate::file`]) that every directory/file operation is built on.

use crate::block::BlockIo;
use crate::error::{FurgfsError, Result};
use crate::fat::ChainTable;
use crate::superblock::Superblock;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// An open, mounted furgfs volume.
///
/// Owns the backing file handle and the in-memory chain table exclusively
/// for its lifetime; nothing about this type is safe to use from two
/// threads at once (see spec §5).
pub struct Volume {
    pub(crate) file: File,
    #[allow(dead_code)]
    path: PathBuf,
    pub(crate) sb: Superblock,
    pub(crate) fat: ChainTable,
    /// Block index of the directory the volume is currently positioned in.
    pub(crate) current_block: u32,
    /// Path components below root, e.g. `["d1", "d2"]` for `/d1/d2`.
    pub(crate) path_components: Vec<String>,
}

impl Volume {
    /// Creates a fresh volume file of `size_mb` megabytes at `path`, using
    /// the default block size, and mounts it.
    pub fn format<P: AsRef<Path>>(path: P, size_mb: u64) -> Result<Self> {
        Self::format_with_block_size(path, size_mb, crate::superblock::DEFAULT_BLOCK_SIZE)
    }

    /// Same as [`Self::format`], with an explicit block size.
    pub fn format_with_block_size<P: AsRef<Path>>(
        path: P,
        size_mb: u64,
        block_size: u32,
    ) -> Result<Self> {
        let total_size = size_mb.saturating_mul(1024 * 1024);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;

        let sb = Superblock::format(&mut file, total_size, block_size)?;
        let fat = ChainTable::load(&mut file, sb.fat_start, sb.total_blocks)?;

        Ok(Self {
            file,
            path: path.as_ref().to_owned(),
            sb,
            fat,
            current_block: 0,
            path_components: Vec::new(),
        })
    }

    /// Opens an existing volume file, validates its superblock, and loads
    /// the chain table fully into memory.
    pub fn mount<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            return Err(FurgfsError::InvalidVolume("file does not exist".into()));
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path.as_ref())?;

        let sb = Superblock::load(&mut file)?;
        let fat = ChainTable::load(&mut file, sb.fat_start, sb.total_blocks)?;

        Ok(Self {
            file,
            path: path.as_ref().to_owned(),
            sb,
            fat,
            current_block: 0,
            path_components: Vec::new(),
        })
    }

    /// Releases the backing file handle. There is no unmount step that
    /// rewrites the superblock: every mutation already flushed the chain
    /// table and directory blocks it touched.
    pub fn close(self) {
        drop(self);
    }

    /// Returns the current directory's path, e.g. `/` or `/d1/d2`.
    pub fn current_path(&self) -> String {
        if self.path_components.is_empty() {
            "/".to_owned()
        } else {
            format!("/{}", self.path_components.join("/"))
        }
    }

    /// Returns `(free_bytes, total_data_bytes)`. Free space is computed from
    /// the in-memory chain table, never from the superblock's `free_blocks`
    /// field (see DESIGN.md Open Question).
    pub fn space_info(&self) -> (u64, u64) {
        let block_size = self.sb.block_size as u64;
        let free_bytes = self.fat.free_count() as u64 * block_size;
        // Block 0 is reserved for the root directory, not data.
        let total_data_bytes = (self.sb.total_blocks.saturating_sub(1)) as u64 * block_size;
        (free_bytes, total_data_bytes)
    }

    /// Borrows a [`BlockIo`] over the current file/layout.
    pub(crate) fn block_io(&mut self) -> BlockIo<'_> {
        BlockIo::new(
            &mut self.file,
            self.sb.block_size,
            self.sb.root_start,
            self.sb.data_start,
        )
    }

    /// Persists the full in-memory chain table to disk and flushes.
    pub(crate) fn persist_fat(&mut self) -> Result<()> {
        self.fat.update(&mut self.file)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::env;

    fn temp_path(name: &str) -> PathBuf {
        let mut p = env::temp_dir();
        p.push(format!("furgfs-test-{}-{}", std::process::id(), name));
        p
    }

    #[test]
    fn format_then_mount_roundtrips_layout() {
        let path = temp_path("format-mount");
        let _ = std::fs::remove_file(&path);

        {
            let vol = Volume::format(&path, 1).unwrap();
            assert_eq!(vol.sb.total_blocks, 1023);
            assert_eq!(vol.current_path(), "/");
        }

        let vol = Volume::mount(&path).unwrap();
        assert_eq!(vol.sb.total_blocks, 1023);
        assert_eq!(vol.sb.data_start, 5248);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn format_rejects_out_of_range_size() {
        let path = temp_path("bad-size");
        let _ = std::fs::remove_file(&path);

        let err = Volume::format(&path, 0).unwrap_err();
        assert!(matches!(err, FurgfsError::InvalidSize));

        let err = Volume::format(&path, 20_000).unwrap_err();
        assert!(matches!(err, FurgfsError::InvalidSize));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn mount_rejects_missing_file() {
        let path = temp_path("missing");
        let _ = std::fs::remove_file(&path);
        assert!(Volume::mount(&path).is_err());
    }

    #[test]
    fn space_info_reports_all_data_blocks_free_on_fresh_volume() {
        let path = temp_path("space-info");
        let _ = std::fs::remove_file(&path);

        let vol = Volume::format(&path, 1).unwrap();
        let (free, total) = vol.space_info();
        assert_eq!(total, (vol.sb.total_blocks as u64 - 1) * vol.sb.block_size as u64);
        assert_eq!(free, total);

        let _ = std::fs::remove_file(&path);
    }
}
