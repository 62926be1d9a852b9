//! The error taxonomy returned at the volume's call boundary.

use std::io;

/// An error produced by a [`crate::Volume`] operation.
///
/// Every validation failure is surfaced without mutating the volume; the one
/// exception is [`FurgfsError::NoSpace`], which is only ever returned after
/// [`crate::fat::ChainTable::allocate_chain`] has rolled back any blocks it
/// provisionally marked used.
#[derive(Debug, thiserror::Error)]
pub enum FurgfsError {
    /// Requested volume size falls outside `[1 MB, 10 000 MB]`.
    #[error("volume size out of range (must be between 1 and 10000 MB)")]
    InvalidSize,
    /// The backing file is missing, too short, or carries the wrong signature.
    #[error("not a valid furgfs volume: {0}")]
    InvalidVolume(String),
    /// A referenced name is absent from its directory.
    #[error("{0}: not found")]
    NotFound(String),
    /// A name collides with an existing entry on create/rename.
    #[error("{0}: already exists")]
    AlreadyExists(String),
    /// A file was expected where a directory was given, or vice versa.
    #[error("{0}: wrong entry type")]
    WrongType(String),
    /// `remove_directory` was called on a directory that isn't empty.
    #[error("{0}: directory not empty")]
    NotEmpty(String),
    /// The target has the protected bit set.
    #[error("{0}: protected")]
    Protected(String),
    /// The allocator could not satisfy the request.
    #[error("not enough free space")]
    NoSpace,
    /// A name is 32 bytes or longer once encoded as UTF-8.
    #[error("name too long (must be at most 31 bytes)")]
    NameTooLong,
    /// All 16 slots of a directory block are occupied.
    #[error("directory full")]
    DirectoryFull,
    /// Digest mismatch after a copy_in/copy_out round trip.
    #[error("integrity check failed for {0}")]
    IntegrityMismatch(String),
    /// Underlying host I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, FurgfsError>;
