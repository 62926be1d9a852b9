//! File engine: writes a byte buffer to a freshly allocated chain, reads a
//! chain back bounded by the recorded size, and removes a file by freeing
//! its chain and clearing its directory entry.
//!
//! `copy_in`/`copy_out` mirror `mkfs`'s own "read host file -> operate ->
//! verify" shape, with an MD5 digest (`md-5`, the crate the wider example
//! pack reaches for this exact round-trip-verification need) standing in
//! for the checksum.

use crate::entry::{DirEntry, EntryType};
use crate::error::{FurgfsError, Result};
use crate::volume::Volume;
use md5::{Digest, Md5};
use std::fs;
use std::path::Path;

fn digest_hex(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

impl Volume {
    /// Writes `content` as a new file named `name` in the current
    /// directory. Forces at least one block even for empty content (see
    /// DESIGN.md: zero-byte files still consume one block).
    pub fn create_file(&mut self, name: &str, content: &[u8]) -> Result<()> {
        if self.lookup(name)?.is_some() {
            return Err(FurgfsError::AlreadyExists(name.to_owned()));
        }

        let block_size = self.sb.block_size as usize;
        let n_blocks = std::cmp::max(1, crate::util::ceil_division(content.len() as u64, block_size as u64) as u32);

        let chain = self.fat.allocate_chain(n_blocks)?;

        for (i, &block) in chain.iter().enumerate() {
            let start = i * block_size;
            let end = std::cmp::min(start + block_size, content.len());
            let chunk = if start < content.len() {
                &content[start..end]
            } else {
                &[]
            };
            if let Err(e) = self.block_io().write_block(block, chunk) {
                self.fat.free_chain(chain[0]);
                return Err(e);
            }
        }

        let entry = match DirEntry::new(name, content.len() as u32, chain[0], EntryType::File) {
            Ok(e) => e,
            Err(e) => {
                self.fat.free_chain(chain[0]);
                return Err(e);
            }
        };
        if let Err(e) = self.write_entry(self.current_block, &entry) {
            self.fat.free_chain(chain[0]);
            return Err(e);
        }

        self.persist_fat()
    }

    /// Reads the file named `name` from the current directory, following
    /// its chain and truncating to the recorded size.
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let (_, entry) = self
            .lookup(name)?
            .ok_or_else(|| FurgfsError::NotFound(name.to_owned()))?;
        if entry.entry_type != EntryType::File {
            return Err(FurgfsError::WrongType(name.to_owned()));
        }

        let block_size = self.sb.block_size as u64;
        let mut remaining = entry.size as u64;
        let mut current = entry.start_block;
        let mut out = Vec::with_capacity(entry.size as usize);

        while remaining > 0 {
            let data = self.block_io().read_block(current)?;
            let take = std::cmp::min(block_size, remaining) as usize;
            out.extend_from_slice(&data[..take]);
            remaining -= take as u64;

            let next = self.fat.get(current);
            if next == crate::fat::FREE || next == crate::fat::END {
                break;
            }
            current = next;
        }

        Ok(out)
    }

    /// Removes the file named `name` from the current directory.
    pub fn remove_file(&mut self, name: &str) -> Result<()> {
        let (slot, entry) = self
            .lookup(name)?
            .ok_or_else(|| FurgfsError::NotFound(name.to_owned()))?;
        if entry.entry_type != EntryType::File {
            return Err(FurgfsError::WrongType(name.to_owned()));
        }
        if entry.protected {
            return Err(FurgfsError::Protected(name.to_owned()));
        }

        self.fat.free_chain(entry.start_block);
        self.clear_slot(self.current_block, slot)?;
        self.persist_fat()
    }

    /// Imports a host file into the current directory, verifying the
    /// round-trip by MD5 digest. `dest_name` defaults to the host file's own
    /// name. On a digest mismatch, the just-written volume file is removed.
    pub fn copy_in<P: AsRef<Path>>(&mut self, host_path: P, dest_name: Option<&str>) -> Result<()> {
        let host_path = host_path.as_ref();
        let content = fs::read(host_path)?;
        let digest = digest_hex(&content);

        let name = match dest_name {
            Some(n) => n.to_owned(),
            None => host_path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| FurgfsError::InvalidVolume("host path has no file name".into()))?
                .to_owned(),
        };

        self.create_file(&name, &content)?;

        let stored = self.read_file(&name)?;
        if digest_hex(&stored) != digest {
            let _ = self.remove_file(&name);
            return Err(FurgfsError::IntegrityMismatch(name));
        }

        Ok(())
    }

    /// Exports the file named `name` to a host file at `host_path`,
    /// verifying the round-trip by MD5 digest. On a mismatch, the
    /// just-written host file is removed.
    pub fn copy_out<P: AsRef<Path>>(&mut self, name: &str, host_path: P) -> Result<()> {
        let content = self.read_file(name)?;
        let digest = digest_hex(&content);

        let host_path = host_path.as_ref();
        fs::write(host_path, &content)?;

        let roundtrip = fs::read(host_path)?;
        if digest_hex(&roundtrip) != digest {
            let _ = fs::remove_file(host_path);
            return Err(FurgfsError::IntegrityMismatch(name.to_owned()));
        }

        Ok(())
    }

    /// Reads the file and reports its MD5 digest and size. Advisory only:
    /// furgfs stores no digest to compare against.
    pub fn verify_integrity(&mut self, name: &str) -> Result<(String, u64)> {
        let content = self.read_file(name)?;
        Ok((digest_hex(&content), content.len() as u64))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::env;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let mut p = env::temp_dir();
        p.push(format!("furgfs-filetest-{}-{}", std::process::id(), name));
        p
    }

    #[test]
    fn empty_file_round_trips_to_empty_buffer() {
        let path = temp_path("empty");
        let _ = std::fs::remove_file(&path);
        let mut vol = Volume::format(&path, 1).unwrap();

        vol.create_file("empty.txt", &[]).unwrap();
        let content = vol.read_file("empty.txt").unwrap();
        assert!(content.is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn small_file_matches_literal_scenario() {
        let path = temp_path("hello");
        let _ = std::fs::remove_file(&path);
        let mut vol = Volume::format(&path, 1).unwrap();

        vol.create_file("a.txt", b"hello\n").unwrap();
        assert_eq!(vol.read_file("a.txt").unwrap(), b"hello\n");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn multi_block_file_truncates_to_recorded_size() {
        let path = temp_path("multiblock");
        let _ = std::fs::remove_file(&path);
        let mut vol = Volume::format(&path, 1).unwrap();

        let content = vec![0x42u8; 2500];
        vol.create_file("b.bin", &content).unwrap();
        let read_back = vol.read_file("b.bin").unwrap();
        assert_eq!(read_back.len(), 2500);
        assert_eq!(read_back, content);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn protected_file_resists_removal_until_unprotected() {
        let path = temp_path("protect");
        let _ = std::fs::remove_file(&path);
        let mut vol = Volume::format(&path, 1).unwrap();

        vol.create_file("a.txt", b"hello\n").unwrap();
        vol.toggle_protection("a.txt").unwrap();
        assert!(matches!(
            vol.remove_file("a.txt").unwrap_err(),
            FurgfsError::Protected(_)
        ));

        vol.toggle_protection("a.txt").unwrap();
        vol.remove_file("a.txt").unwrap();
        assert!(vol.list(false).unwrap().is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn no_space_leaves_table_unchanged() {
        let path = temp_path("nospace");
        let _ = std::fs::remove_file(&path);
        let mut vol = Volume::format(&path, 1).unwrap();

        let free_before = vol.fat.free_count();
        // Fill all but one free data block.
        let fill = (free_before - 1) as usize * vol.sb.block_size as usize;
        vol.create_file("filler", &vec![0u8; fill]).unwrap();

        let free_mid = vol.fat.free_count();
        assert_eq!(free_mid, 1);

        let err = vol.create_file("toolarge", &vec![0u8; vol.sb.block_size as usize * 2]);
        assert!(matches!(err, Err(FurgfsError::NoSpace)));
        assert_eq!(vol.fat.free_count(), free_mid);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn copy_in_and_out_round_trip() {
        let vol_path = temp_path("copy-vol");
        let host_in = temp_path("copy-in.bin");
        let host_out = temp_path("copy-out.bin");
        let _ = std::fs::remove_file(&vol_path);
        let _ = std::fs::remove_file(&host_in);
        let _ = std::fs::remove_file(&host_out);

        std::fs::write(&host_in, b"some file content\nwith a couple lines\n").unwrap();

        let mut vol = Volume::format(&vol_path, 1).unwrap();
        vol.copy_in(&host_in, Some("doc.txt")).unwrap();
        vol.copy_out("doc.txt", &host_out).unwrap();

        let original = std::fs::read(&host_in).unwrap();
        let roundtrip = std::fs::read(&host_out).unwrap();
        assert_eq!(original, roundtrip);

        let _ = std::fs::remove_file(&vol_path);
        let _ = std::fs::remove_file(&host_in);
        let _ = std::fs::remove_file(&host_out);
    }
}
