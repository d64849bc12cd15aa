//! Lazily populated, case-insensitive cache of a backend's directory structure.
//!
//! The tree maps case-folded names to the true names reported by the backend.
//! A directory is enumerated once, on the first query that touches it; every
//! later lookup in that directory is a hash lookup on the folded name. Entries
//! reflect the backend at population time until `clear` is called.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::core::{Backend, VfsError, VfsResult, utils};
use crate::{DirEntry, EntryType};

/// One enumerated directory.
#[derive(Debug, Default)]
struct Listing {
    /// Every entry, in backend enumeration order.
    entries: Vec<DirEntry>,
    /// Folded name → index of the first entry folding to it.
    folded: IndexMap<String, usize>,
}

impl Listing {
    fn new(entries: Vec<DirEntry>) -> Self {
        let mut folded = IndexMap::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let key = utils::fold(entry.name());
            if let Some(&first) = folded.get(&key) {
                let kept: &DirEntry = &entries[first];
                tracing::debug!(
                    kept = kept.name(),
                    shadowed = entry.name(),
                    "case-folded name collision"
                );
                continue;
            }
            folded.insert(key, index);
        }
        Self { entries, folded }
    }

    fn lookup(&self, name: &str, case_sensitive: bool) -> Option<&DirEntry> {
        if case_sensitive {
            self.entries.iter().find(|e| e.name() == name)
        } else {
            self.folded
                .get(&utils::fold(name))
                .map(|&index| &self.entries[index])
        }
    }
}

/// Arguments of an advanced file search.
///
/// ```
/// use asset_vfs::FindArgs;
///
/// let exts = [".png", ".bmp"];
/// let args = FindArgs::new("Title").in_directory("Title").with_exts(&exts);
/// assert_eq!(args.filename, "Title");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FindArgs<'a> {
    /// Directory the filename is relative to, may be empty.
    pub directory: &'a str,
    /// Name (or relative path) of the file to search.
    pub filename: &'a str,
    /// Extensions appended to `filename`, probed in order when the bare name misses.
    pub exts: &'a [&'a str],
    /// Compare true names byte-for-byte instead of folding.
    pub case_sensitive: bool,
    /// Emit a warning when nothing matches.
    pub warn_not_found: bool,
}

impl<'a> FindArgs<'a> {
    pub fn new(filename: &'a str) -> Self {
        Self {
            filename,
            ..Default::default()
        }
    }

    pub fn in_directory(mut self, directory: &'a str) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_exts(mut self, exts: &'a [&'a str]) -> Self {
        self.exts = exts;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn warn_not_found(mut self, warn: bool) -> Self {
        self.warn_not_found = warn;
        self
    }
}

/// Case-insensitive directory cache anchored at `root` inside a backend.
///
/// All paths taken and returned by the tree are relative to `root`; the
/// backend is called with `root` prepended.
#[derive(Debug, Default)]
pub struct DirectoryTree {
    root: String,
    dirs: HashMap<String, String>,
    listings: HashMap<String, Listing>,
}

impl DirectoryTree {
    /// `root` is a true-case backend path.
    pub fn new(root: &str) -> Self {
        Self {
            root: utils::normalize(root),
            ..Default::default()
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Prepends the tree root to a resolved path.
    pub fn backend_path(&self, path: &str) -> String {
        utils::join(&self.root, path)
    }

    /// Drops every cached directory.
    pub fn clear(&mut self) {
        self.dirs.clear();
        self.listings.clear();
    }

    /// Number of directories enumerated so far.
    pub fn cached_directories(&self) -> usize {
        self.listings.len()
    }

    /// Finds a file or directory and returns its true path and kind.
    ///
    /// The bare name is tried first, then `name + ext` for every extension in
    /// order; the first hit wins. With extensions the search is for a file,
    /// so directories never match. An empty filename never matches.
    pub fn find(&mut self, backend: &dyn Backend, args: &FindArgs<'_>) -> Option<(String, EntryType)> {
        if args.filename.is_empty() {
            return None;
        }
        // `..` in the filename may climb out of the directory
        let path = utils::join(args.directory, args.filename);
        if path.is_empty() {
            return None;
        }
        let (dir, leaf) = utils::split_leaf(&path);
        let files_only = !args.exts.is_empty();

        let (true_dir, complete) = self.walk(backend, dir, args.case_sensitive);
        let found = if complete {
            let listing = self.listing(backend, &true_dir).ok()?;
            std::iter::once(leaf.to_string())
                .chain(args.exts.iter().map(|ext| format!("{leaf}{ext}")))
                .filter_map(|candidate| listing.lookup(&candidate, args.case_sensitive))
                .find(|e| !(files_only && e.is_dir()))
                .map(|e| (utils::join(&true_dir, e.name()), e.entry_type()))
        } else {
            None
        };

        if found.is_none() {
            if args.warn_not_found {
                tracing::warn!(path = %path, exts = ?args.exts, "cannot find file");
            } else {
                tracing::trace!(path = %path, "not found");
            }
        }
        found
    }

    /// Resolves an existing file or directory. The root resolves to itself.
    pub fn resolve(&mut self, backend: &dyn Backend, path: &str) -> Option<(String, EntryType)> {
        let path = utils::normalize(path);
        if path.is_empty() {
            return Some((String::new(), EntryType::Directory));
        }
        self.find(backend, &FindArgs::new(&path))
    }

    /// Resolves a path that is about to be written.
    ///
    /// Existing directories and an existing leaf are replaced by their true
    /// names; the part that does not exist yet is kept as given.
    pub fn resolve_for_write(&mut self, backend: &dyn Backend, path: &str) -> Option<String> {
        let path = utils::normalize(path);
        if path.is_empty() {
            return None;
        }
        let (dir, leaf) = utils::split_leaf(&path);
        let (true_dir, complete) = self.walk(backend, dir, false);
        let leaf = if complete {
            self.listing(backend, &true_dir)
                .ok()
                .and_then(|listing| listing.lookup(leaf, false))
                .map(|e| e.name().to_string())
                .unwrap_or_else(|| leaf.to_string())
        } else {
            leaf.to_string()
        };
        Some(utils::join(&true_dir, &leaf))
    }

    /// Resolves an existing directory to its true path.
    pub fn resolve_dir(&mut self, backend: &dyn Backend, dir: &str) -> Option<String> {
        match self.walk(backend, &utils::normalize(dir), false) {
            (true_dir, true) => Some(true_dir),
            _ => None,
        }
    }

    /// Lists a directory through the cache.
    ///
    /// A missing directory is `Err(NotFound)`, distinct from an empty listing.
    pub fn list_directory(&mut self, backend: &dyn Backend, dir: &str) -> VfsResult<Vec<DirEntry>> {
        let dir = utils::normalize(dir);
        let (true_dir, complete) = self.walk(backend, &dir, false);
        if !complete {
            return Err(VfsError::not_found(dir));
        }
        Ok(self.listing(backend, &true_dir)?.entries.clone())
    }

    /// Walks `dir` segment by segment. Returns the true path of the longest
    /// existing prefix with the remaining segments appended as given, and
    /// whether every segment matched an existing directory.
    fn walk(&mut self, backend: &dyn Backend, dir: &str, case_sensitive: bool) -> (String, bool) {
        if dir.is_empty() {
            return (String::new(), true);
        }
        let folded = utils::fold(dir);
        if !case_sensitive {
            if let Some(true_dir) = self.dirs.get(&folded) {
                return (true_dir.clone(), true);
            }
        }

        let parts: Vec<&str> = utils::components(dir).collect();
        let mut current = String::new();
        for (i, part) in parts.iter().enumerate() {
            let child = self
                .listing(backend, &current)
                .ok()
                .and_then(|listing| listing.lookup(part, case_sensitive))
                .filter(|e| e.is_dir())
                .map(|e| e.name().to_string());
            match child {
                Some(name) => current = utils::join(&current, &name),
                None => {
                    let rest = parts[i..].join("/");
                    return (utils::join(&current, &rest), false);
                }
            }
        }

        if !case_sensitive {
            self.dirs.insert(folded, current.clone());
        }
        (current, true)
    }

    /// Returns the cached listing of a true directory path, enumerating it
    /// through the backend on first use. Failures are not cached.
    fn listing(&mut self, backend: &dyn Backend, true_dir: &str) -> VfsResult<&Listing> {
        if !self.listings.contains_key(true_dir) {
            let backend_dir = self.backend_path(true_dir);
            let entries = backend.list_directory(&backend_dir).inspect_err(|e| {
                tracing::trace!(backend = backend.name(), dir = %backend_dir, error = %e, "listing failed");
            })?;

            let listing = Listing::new(entries);
            tracing::trace!(dir = %backend_dir, entries = listing.entries.len(), "cached directory");
            self.listings.insert(true_dir.to_string(), listing);
        }
        self.listings
            .get(true_dir)
            .ok_or_else(|| VfsError::not_found(true_dir))
    }
}
