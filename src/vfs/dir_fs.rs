//! This module provides a backend that maps to a real directory on the host system.
//!
//! ### Key Features:
//! - **Isolated root**: All operations are confined to a designated root directory (self.root).
//! - **Hierarchical writes**: Output streams create missing parent directories.
//! - **Cross‑platform**: Uses std::path::Path and PathBuf for portable path handling.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::{Backend, OpenMode, ReadSeek, VfsError, VfsResult, utils};
use crate::{DirEntry, EntryType};

/// A backend that maps to a real directory on the host system.
///
/// `DirFS` receives paths that are already normalized and case-resolved; it
/// simply joins them onto its host `root`. Case-insensitive lookup is done one
/// level up, by the directory tree of the owning filesystem.
///
/// ### Usage notes:
/// - Permissions are not automatically adjusted; ensure `root` is writable if you
///   intend to open output streams.
/// - Not thread‑safe; it is owned by exactly one filesystem.
///
/// ### Example:
/// ```
/// use asset_vfs::{Backend, DirFS};
///
/// let root = std::env::temp_dir();
/// let fs = DirFS::new(&root).unwrap();
/// assert!(fs.is_directory("", true));
/// ```
#[derive(Debug)]
pub struct DirFS {
    root: PathBuf, // host-related path
}

impl DirFS {
    /// Creates a new DirFS instance with the root directory at `root`.
    /// * `root` is a host path. It must exist and be a directory.
    pub fn new<P: AsRef<Path>>(root: P) -> VfsResult<Self> {
        let root = root.as_ref();

        if root.as_os_str().is_empty() {
            return Err(VfsError::invalid_path("empty root"));
        }
        if !root.exists() {
            return Err(VfsError::not_found(root.display().to_string()));
        }
        if !root.is_dir() {
            return Err(VfsError::not_a_directory(root.display().to_string()));
        }

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Returns root path related to the host file system.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Returns the host path for a backend-native path.
    /// `.` and `..` are resolved first and never leave `root`.
    fn to_host(&self, path: &str) -> PathBuf {
        let mut host = self.root.clone();
        for part in utils::components(&utils::normalize(path)) {
            host.push(part);
        }
        host
    }
}

impl Backend for DirFS {
    fn name(&self) -> &'static str {
        "dir"
    }

    fn is_file(&self, path: &str) -> bool {
        self.to_host(path).is_file()
    }

    fn is_directory(&self, path: &str, follow_symlinks: bool) -> bool {
        let host = self.to_host(path);
        let meta = if follow_symlinks {
            std::fs::metadata(&host)
        } else {
            std::fs::symlink_metadata(&host)
        };
        meta.map(|m| m.is_dir()).unwrap_or(false)
    }

    fn exists(&self, path: &str) -> bool {
        self.to_host(path).exists()
    }

    fn file_size(&self, path: &str) -> i64 {
        match std::fs::metadata(self.to_host(path)) {
            Ok(meta) if meta.is_file() => i64::try_from(meta.len()).unwrap_or(i64::MAX),
            _ => -1,
        }
    }

    fn create_input_stream(&self, path: &str, _mode: OpenMode) -> VfsResult<Box<dyn ReadSeek>> {
        let host = self.to_host(path);
        if host.is_dir() {
            return Err(VfsError::is_a_directory(path));
        }
        let file = std::fs::File::open(&host).map_err(|e| VfsError::from_io(path, e))?;
        Ok(Box::new(file))
    }

    fn create_output_stream(&self, path: &str, mode: OpenMode) -> VfsResult<Box<dyn Write>> {
        if path.is_empty() {
            return Err(VfsError::invalid_path("empty file name"));
        }
        let host = self.to_host(path);
        if host.is_dir() {
            return Err(VfsError::is_a_directory(path));
        }
        if let Some(parent) = host.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true);
        if mode.is_append() {
            options.append(true);
        } else {
            options.truncate(true);
        }
        let file = options.open(&host).map_err(|e| VfsError::from_io(path, e))?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn list_directory(&self, path: &str) -> VfsResult<Vec<DirEntry>> {
        let host = self.to_host(path);
        if host.exists() && !host.is_dir() {
            return Err(VfsError::not_a_directory(path));
        }

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&host).map_err(|e| VfsError::from_io(path, e))? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                tracing::trace!(path, "skipping non UTF-8 entry name");
                continue;
            };
            // file_type() does not follow symlinks; metadata() does
            let is_dir = match entry.file_type() {
                Ok(ft) if ft.is_symlink() => entry.path().is_dir(),
                Ok(ft) => ft.is_dir(),
                Err(_) => false,
            };
            let entry_type = if is_dir {
                EntryType::Directory
            } else {
                EntryType::File
            };
            entries.push(DirEntry::new(name, entry_type));
        }

        Ok(entries)
    }

    fn host_path(&self, path: &str) -> Option<PathBuf> {
        Some(self.to_host(path))
    }
}
