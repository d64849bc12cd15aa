//! The backend contract shared by every storage implementation.

mod error;
pub mod utils;

use std::io::{Read, Seek, Write};
use std::path::PathBuf;

use bitflags::bitflags;

use crate::DirEntry;

pub use error::{VfsError, VfsResult};

pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// A readable, seekable byte source produced by a backend.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

bitflags! {
    /// Stream open flags, mirroring conventional file-open semantics.
    ///
    /// Bytes are never transformed: `BINARY` is accepted for clarity, but text
    /// mode performs no newline translation either.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenMode: u8 {
        const READ = 0b0000_0001;
        const WRITE = 0b0000_0010;
        const APPEND = 0b0000_0100;
        const TRUNCATE = 0b0000_1000;
        const BINARY = 0b0001_0000;
    }
}

impl OpenMode {
    /// `READ | BINARY`
    pub fn input() -> Self {
        Self::READ | Self::BINARY
    }

    /// `WRITE | TRUNCATE | BINARY`
    pub fn output() -> Self {
        Self::WRITE | Self::TRUNCATE | Self::BINARY
    }

    /// `WRITE | APPEND | BINARY`
    pub fn append() -> Self {
        Self::WRITE | Self::APPEND | Self::BINARY
    }

    /// Appending wins over truncation when both are requested.
    pub fn is_append(&self) -> bool {
        self.contains(Self::APPEND)
    }
}

/// Storage primitives implemented by every concrete backend.
///
/// All paths are backend-native: `/`-separated, relative to the backend root,
/// normalized and already case-resolved by the caller. Queries never mutate
/// state and answer `false` (or `-1`) for missing paths. Stream and listing
/// operations return a `VfsResult` so that "missing" and "errored" stay
/// distinguishable; nothing here panics.
pub trait Backend {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    fn is_file(&self, path: &str) -> bool;

    fn is_directory(&self, path: &str, follow_symlinks: bool) -> bool;

    fn exists(&self, path: &str) -> bool;

    /// Size of a regular file in bytes, `-1` otherwise.
    fn file_size(&self, path: &str) -> i64;

    /// Opens a readable stream positioned at the start of the file.
    fn create_input_stream(&self, path: &str, mode: OpenMode) -> VfsResult<Box<dyn ReadSeek>>;

    /// Opens a writable stream. Hierarchical backends create missing parent
    /// directories; read-only backends answer `VfsError::ReadOnly`.
    fn create_output_stream(&self, path: &str, mode: OpenMode) -> VfsResult<Box<dyn Write>>;

    /// Immediate children of a directory. An empty directory is `Ok(vec![])`.
    fn list_directory(&self, path: &str) -> VfsResult<Vec<DirEntry>>;

    /// The host path backing `path`, for backends that map to the host
    /// filesystem.
    fn host_path(&self, _path: &str) -> Option<PathBuf> {
        None
    }
}
