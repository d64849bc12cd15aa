//! This module provides a backend that maps to a memory storage.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::rc::Rc;

use anyhow::anyhow;

use crate::core::{Backend, OpenMode, ReadSeek, Result, VfsError, VfsResult, utils};
use crate::{DirEntry, EntryType};

#[derive(Debug, Clone)]
struct Node {
    entry_type: EntryType,
    content: Vec<u8>,
}

impl Node {
    fn dir() -> Self {
        Self {
            entry_type: EntryType::Directory,
            content: Vec::new(),
        }
    }

    fn file(content: &[u8]) -> Self {
        Self {
            entry_type: EntryType::File,
            content: content.to_vec(),
        }
    }

    fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}

type Entries = BTreeMap<String, Node>;

/// A backend that stores file and directory entries in memory.
///
/// ### Internal state
///
/// * `entries`: the storage map holding all entries.
///   - Key: normalized path relative to the backend root; the root itself is `""`.
///   - Value: entry kind and (for files) content.
///   - Shared with open output streams, which write straight into it.
///
/// ### Invariants
///
/// 1. **Root existence**: `""` is always present and has type `Directory`.
/// 2. **Path normalization**: All keys are normalized (see `core::utils::normalize`).
/// 3. **Parent consistency**: For any entry at `a/b/c`, there is a `Directory` entry `a/b`.
///
/// A frozen (`read_only`) map refuses output streams; archives are loaded into
/// frozen maps.
///
/// ### Example
///
/// ```
/// use asset_vfs::{Backend, MapFS};
///
/// let fs = MapFS::new();
/// fs.mkfile("Docs/Note.txt", Some(b"Hello")).unwrap();
/// assert!(fs.is_file("Docs/Note.txt"));
/// assert!(fs.is_directory("Docs", true));
/// ```
#[derive(Debug, Clone)]
pub struct MapFS {
    entries: Rc<RefCell<Entries>>,
    read_only: bool,
}

impl Default for MapFS {
    fn default() -> Self {
        Self::new()
    }
}

impl MapFS {
    /// Creates an empty, writable MapFS containing only the root directory.
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(String::new(), Node::dir());
        Self {
            entries: Rc::new(RefCell::new(entries)),
            read_only: false,
        }
    }

    /// Freezes or unfreezes the map for output streams.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Creates directory and all its parents (if needed).
    pub fn mkdir(&self, path: &str) -> Result<()> {
        let path = utils::normalize(path);
        if path.is_empty() {
            return Err(anyhow!("invalid path: empty"));
        }
        let mut entries = self.entries.borrow_mut();
        if entries.contains_key(&path) {
            return Err(anyhow!("path already exists: {path}"));
        }
        Self::mkdir_all(&mut entries, &path)
    }

    /// Creates a new file. Missing parent directories are created.
    pub fn mkfile(&self, path: &str, content: Option<&[u8]>) -> Result<()> {
        let path = utils::normalize(path);
        if path.is_empty() {
            return Err(anyhow!("invalid path: empty"));
        }
        let mut entries = self.entries.borrow_mut();
        if entries.contains_key(&path) {
            return Err(anyhow!("{path} already exist"));
        }
        let (parent, _) = utils::split_leaf(&path);
        Self::mkdir_all(&mut entries, parent)?;
        entries.insert(path.clone(), Node::file(content.unwrap_or_default()));
        Ok(())
    }

    /// Reads the entire contents of a file into a byte vector.
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = utils::normalize(path);
        let entries = self.entries.borrow();
        match entries.get(&path) {
            None => Err(anyhow!("{path} does not exist")),
            Some(node) if node.is_dir() => Err(anyhow!("{path} is a directory")),
            Some(node) => Ok(node.content.clone()),
        }
    }

    /// Removes a file or a directory with all its contents.
    pub fn rm(&self, path: &str) -> Result<()> {
        let path = utils::normalize(path);
        if path.is_empty() {
            return Err(anyhow!("invalid path: the root cannot be removed"));
        }
        let mut entries = self.entries.borrow_mut();
        if !entries.contains_key(&path) {
            return Err(anyhow!("{path} does not exist"));
        }
        let prefix = format!("{path}/");
        entries.retain(|key, _| key != &path && !key.starts_with(&prefix));
        Ok(())
    }

    fn mkdir_all(entries: &mut Entries, path: &str) -> Result<()> {
        let mut built = String::new();
        for part in utils::components(path) {
            built = utils::join(&built, part);
            match entries.get(&built) {
                Some(node) if !node.is_dir() => {
                    return Err(anyhow!("path '{built}' exists but is not a directory"));
                }
                Some(_) => {}
                None => {
                    entries.insert(built.clone(), Node::dir());
                }
            }
        }
        Ok(())
    }

    fn node_type(&self, path: &str) -> Option<EntryType> {
        self.entries.borrow().get(path).map(|n| n.entry_type)
    }
}

/// Writes straight into the shared map of a `MapFS`.
struct MapWriter {
    entries: Rc<RefCell<Entries>>,
    path: String,
}

impl Write for MapWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut entries = self.entries.borrow_mut();
        // a file removed while the stream is open stays removed
        let Some(node) = entries.get_mut(&self.path) else {
            return Err(VfsError::not_found(self.path.clone()).into());
        };
        if node.is_dir() {
            return Err(VfsError::is_a_directory(self.path.clone()).into());
        }
        node.content.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Backend for MapFS {
    fn name(&self) -> &'static str {
        "map"
    }

    fn is_file(&self, path: &str) -> bool {
        self.node_type(path) == Some(EntryType::File)
    }

    fn is_directory(&self, path: &str, _follow_symlinks: bool) -> bool {
        self.node_type(path) == Some(EntryType::Directory)
    }

    fn exists(&self, path: &str) -> bool {
        self.node_type(path).is_some()
    }

    fn file_size(&self, path: &str) -> i64 {
        match self.entries.borrow().get(path) {
            Some(node) if !node.is_dir() => i64::try_from(node.content.len()).unwrap_or(i64::MAX),
            _ => -1,
        }
    }

    fn create_input_stream(&self, path: &str, _mode: OpenMode) -> VfsResult<Box<dyn ReadSeek>> {
        match self.entries.borrow().get(path) {
            None => Err(VfsError::not_found(path)),
            Some(node) if node.is_dir() => Err(VfsError::is_a_directory(path)),
            Some(node) => Ok(Box::new(Cursor::new(node.content.clone()))),
        }
    }

    fn create_output_stream(&self, path: &str, mode: OpenMode) -> VfsResult<Box<dyn Write>> {
        if self.read_only {
            return Err(VfsError::ReadOnly);
        }
        if path.is_empty() {
            return Err(VfsError::invalid_path("empty file name"));
        }
        {
            let mut entries = self.entries.borrow_mut();
            let (parent, _) = utils::split_leaf(path);
            Self::mkdir_all(&mut entries, parent)
                .map_err(|_| VfsError::not_a_directory(parent))?;
            let node = entries
                .entry(path.to_string())
                .or_insert_with(|| Node::file(&[]));
            if node.is_dir() {
                return Err(VfsError::is_a_directory(path));
            }
            if !mode.is_append() {
                node.content.clear();
            }
        }
        Ok(Box::new(MapWriter {
            entries: Rc::clone(&self.entries),
            path: path.to_string(),
        }))
    }

    fn list_directory(&self, path: &str) -> VfsResult<Vec<DirEntry>> {
        let entries = self.entries.borrow();
        match entries.get(path) {
            None => return Err(VfsError::not_found(path)),
            Some(node) if !node.is_dir() => return Err(VfsError::not_a_directory(path)),
            Some(_) => {}
        }
        Ok(entries
            .iter()
            .filter(|(key, _)| !key.is_empty())
            .filter_map(|(key, node)| {
                let (parent, leaf) = utils::split_leaf(key);
                (parent == path).then(|| DirEntry::new(leaf, node.entry_type))
            })
            .collect())
    }
}
