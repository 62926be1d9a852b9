//! `furgfs` is a self-contained, single-file hierarchical filesystem: a
//! volume's files and directories live inside one host-level regular file,
//! addressed by fixed-size blocks and a linked-list allocation table (a
//! "chain table").
//!
//! The crate exposes a single [`Volume`] type covering the whole library
//! surface: format a fresh volume, mount an existing one, navigate its
//! directory tree, import/export files from/to the host, rename and remove
//! entries, toggle per-entry deletion protection, and verify byte-exact
//! integrity of stored files via MD5. Everything above that — an
//! interactive menu, host path prompts, human-size formatting — is a
//! caller concern; see `src/bin/furgfs/main.rs` for a minimal one.

pub mod block;
mod dir;
pub mod entry;
pub mod error;
pub mod fat;
mod file;
pub mod superblock;
pub mod util;
mod volume;

pub use dir::ListedEntry;
pub use entry::{DirEntry, EntryType};
pub use error::{FurgfsError, Result};
pub use volume::Volume;
