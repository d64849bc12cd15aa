//! The mount graph: an arena of filesystems and the recognizers that build them.
//!
//! `Vfs` owns every filesystem. A filesystem created from a path found inside
//! another filesystem is registered as that filesystem's child, and releasing
//! a filesystem releases all of its descendants. Views borrow the arena, so no
//! view can outlive it; a released handle is detected on every access.

use std::cell::RefCell;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::core::{Backend, OpenMode, ReadSeek, utils};
use crate::vfs::tar_fs;
use crate::{DirFS, EntryType, Filesystem, FilesystemView};

/// Index of a filesystem inside its `Vfs`. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FsHandle(usize);

impl FsHandle {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Where a path was found by a [`Source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// The whole path is an existing directory.
    Directory(String),
    /// A prefix of the path is a file; `inner` is the rest of the path, to be
    /// looked up inside whatever that file contains.
    Container { file: String, inner: String },
}

/// The place a path is recognized in: the host, or an existing filesystem.
pub trait Source {
    /// Classifies `path`, resolving it as the source resolves names.
    fn locate(&self, path: &str) -> Option<Location>;

    /// Opens a located container file.
    fn open(&self, file: &str) -> Option<Box<dyn ReadSeek>>;

    /// Host path of a located directory, if the source maps to the host.
    fn host_path(&self, dir: &str) -> Option<PathBuf>;
}

/// Host filesystem paths, taken literally.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostSource;

impl Source for HostSource {
    fn locate(&self, path: &str) -> Option<Location> {
        let full = Path::new(path);
        if full.is_dir() {
            return Some(Location::Directory(path.to_string()));
        }
        let file = full.ancestors().find(|p| p.is_file())?;
        let inner = full
            .strip_prefix(file)
            .ok()?
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect::<Vec<_>>()
            .join("/");
        Some(Location::Container {
            file: file.to_str()?.to_string(),
            inner,
        })
    }

    fn open(&self, file: &str) -> Option<Box<dyn ReadSeek>> {
        let file = std::fs::File::open(file)
            .inspect_err(|e| tracing::debug!(file, error = %e, "cannot open container"))
            .ok()?;
        Some(Box::new(file))
    }

    fn host_path(&self, dir: &str) -> Option<PathBuf> {
        Some(PathBuf::from(dir))
    }
}

impl Source for Filesystem {
    fn locate(&self, path: &str) -> Option<Location> {
        let path = utils::normalize(path);
        match self.resolve_entry(&path) {
            Some((dir, EntryType::Directory)) => return Some(Location::Directory(dir)),
            Some((file, EntryType::File)) => {
                return Some(Location::Container {
                    file,
                    inner: String::new(),
                });
            }
            None => {}
        }
        // the full path is not there: look for a file among its ancestors
        let parts: Vec<&str> = utils::components(&path).collect();
        for i in 1..parts.len() {
            match self.resolve_entry(&parts[..i].join("/"))? {
                (_, EntryType::Directory) => continue,
                (file, EntryType::File) => {
                    return Some(Location::Container {
                        file,
                        inner: parts[i..].join("/"),
                    });
                }
            }
        }
        None
    }

    fn open(&self, file: &str) -> Option<Box<dyn ReadSeek>> {
        let stream = self.open_input_stream(file, OpenMode::input())?;
        Some(Box::new(stream))
    }

    fn host_path(&self, dir: &str) -> Option<PathBuf> {
        Filesystem::host_path(self, dir)
    }
}

/// A strategy that turns a located path into a backend.
///
/// Recognizers are tried in a fixed order; the first one returning a backend
/// wins. For a container the backend is rooted at the container, the `inner`
/// part of the location is resolved afterwards.
pub trait Recognizer {
    fn name(&self) -> &'static str;

    fn recognize(&self, source: &dyn Source, location: &Location) -> Option<Box<dyn Backend>>;
}

/// `.tar.gz` and `.tgz` archives.
#[derive(Debug, Default)]
pub struct TarGzRecognizer;

impl Recognizer for TarGzRecognizer {
    fn name(&self) -> &'static str {
        "tar.gz"
    }

    fn recognize(&self, source: &dyn Source, location: &Location) -> Option<Box<dyn Backend>> {
        let data = read_container(source, location, &[".tar.gz", ".tgz"])?;
        if !tar_fs::is_gzip(&data) {
            return None;
        }
        let fs = tar_fs::load_tar_gz(data.as_slice())
            .inspect_err(|e| tracing::warn!(error = ?e, "cannot load tar.gz archive"))
            .ok()?;
        Some(Box::new(fs))
    }
}

/// Plain `.tar` archives.
#[derive(Debug, Default)]
pub struct TarRecognizer;

impl Recognizer for TarRecognizer {
    fn name(&self) -> &'static str {
        "tar"
    }

    fn recognize(&self, source: &dyn Source, location: &Location) -> Option<Box<dyn Backend>> {
        let data = read_container(source, location, &[".tar"])?;
        if !tar_fs::is_tar(&data) {
            return None;
        }
        let fs = tar_fs::load_tar(data.as_slice())
            .inspect_err(|e| tracing::warn!(error = ?e, "cannot load tar archive"))
            .ok()?;
        Some(Box::new(fs))
    }
}

/// Host directories. The generic fallback, tried last.
#[derive(Debug, Default)]
pub struct DirectoryRecognizer;

impl Recognizer for DirectoryRecognizer {
    fn name(&self) -> &'static str {
        "dir"
    }

    fn recognize(&self, source: &dyn Source, location: &Location) -> Option<Box<dyn Backend>> {
        let Location::Directory(dir) = location else {
            return None;
        };
        let host = source.host_path(dir)?;
        let fs = DirFS::new(&host)
            .inspect_err(|e| tracing::debug!(host = %host.display(), error = %e, "not a directory"))
            .ok()?;
        Some(Box::new(fs))
    }
}

/// Reads a container whose name carries one of `suffixes`.
fn read_container(source: &dyn Source, location: &Location, suffixes: &[&str]) -> Option<Vec<u8>> {
    let Location::Container { file, .. } = location else {
        return None;
    };
    if !suffixes.iter().any(|s| utils::ends_with_folded(file, s)) {
        return None;
    }
    let mut data = Vec::new();
    source
        .open(file)?
        .read_to_end(&mut data)
        .inspect_err(|e| tracing::warn!(file, error = %e, "cannot read container"))
        .ok()?;
    Some(data)
}

/// The default recognizers: most specific containers first, directories last.
pub fn default_recognizers() -> Vec<Box<dyn Recognizer>> {
    vec![
        Box::new(TarGzRecognizer),
        Box::new(TarRecognizer),
        Box::new(DirectoryRecognizer),
    ]
}

/// Owner of all filesystems and of the recognizer order.
///
/// Single-threaded: `Vfs` is neither `Send` nor `Sync`.
///
/// ```no_run
/// use asset_vfs::Vfs;
///
/// let vfs = Vfs::new();
/// let game = vfs.create("/games/my_game");
/// if game.is_valid() {
///     let title = game.find_file_in("Title", "title", &[".png", ".bmp"]);
///     println!("{title:?}");
/// }
/// ```
pub struct Vfs {
    nodes: RefCell<Vec<Option<Rc<Filesystem>>>>,
    recognizers: Vec<Box<dyn Recognizer>>,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    pub fn new() -> Self {
        Self::with_recognizers(default_recognizers())
    }

    /// Uses `recognizers`, in this exact priority order.
    pub fn with_recognizers(recognizers: Vec<Box<dyn Recognizer>>) -> Self {
        Self {
            nodes: RefCell::new(Vec::new()),
            recognizers,
        }
    }

    /// Creates a root filesystem from a host path.
    ///
    /// The path may continue inside a container (`/games/rpg.tar/Data`).
    /// Returns an invalid view when no recognizer accepts the path.
    pub fn create(&self, host_path: &str) -> FilesystemView<'_> {
        if host_path.is_empty() {
            return FilesystemView::default();
        }
        self.create_from(&HostSource, None, host_path)
    }

    /// Roots an explicitly built backend.
    pub fn mount(&self, backend: Box<dyn Backend>, base_path: &str) -> FilesystemView<'_> {
        self.insert(None, backend, base_path.to_string(), "")
    }

    /// A view on the root of a live filesystem.
    pub fn view(&self, handle: FsHandle) -> FilesystemView<'_> {
        match self.get(handle) {
            Some(fs) if fs.is_valid() => FilesystemView::new(self, handle, String::new()),
            _ => FilesystemView::default(),
        }
    }

    /// The filesystem behind `handle`, if it has not been released.
    pub fn get(&self, handle: FsHandle) -> Option<Rc<Filesystem>> {
        self.nodes.borrow().get(handle.0).cloned().flatten()
    }

    /// Releases a filesystem and, recursively, every filesystem mounted from
    /// it. Views on any of them report failure afterwards.
    pub fn release(&self, handle: FsHandle) -> bool {
        let Some(fs) = self.nodes.borrow_mut().get_mut(handle.0).and_then(Option::take) else {
            return false;
        };
        for child in fs.children() {
            self.release(child);
        }
        if let Some(parent) = fs.parent().and_then(|p| self.get(p)) {
            parent.remove_child(handle);
        }
        tracing::debug!(handle = handle.0, path = fs.path(), "released filesystem");
        true
    }

    /// Number of live filesystems.
    pub fn len(&self) -> usize {
        self.nodes.borrow().iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recognizes `path` inside `parent` and registers the result as its child.
    pub(crate) fn create_in(&self, parent: &Rc<Filesystem>, path: &str) -> FilesystemView<'_> {
        let path = utils::normalize(path);
        match parent.locate(&path) {
            Some(Location::Directory(dir)) if parent.host_path(&dir).is_none() => {
                // directories of non-host backends are plain subtrees
                FilesystemView::new(self, parent.handle(), dir)
            }
            _ => self.create_from(&**parent, Some(parent), &path),
        }
    }

    fn create_from(
        &self,
        source: &dyn Source,
        parent: Option<&Rc<Filesystem>>,
        path: &str,
    ) -> FilesystemView<'_> {
        let Some(location) = source.locate(path) else {
            tracing::debug!(path, "path not found");
            return FilesystemView::default();
        };

        for recognizer in &self.recognizers {
            if let Some(backend) = recognizer.recognize(source, &location) {
                tracing::debug!(path, recognizer = recognizer.name(), "recognized");
                let inner = match &location {
                    Location::Container { inner, .. } => inner.as_str(),
                    Location::Directory(_) => "",
                };
                return self.insert(parent, backend, path.to_string(), inner);
            }
        }

        tracing::debug!(path, "no recognizer accepted path");
        FilesystemView::default()
    }

    fn insert(
        &self,
        parent: Option<&Rc<Filesystem>>,
        backend: Box<dyn Backend>,
        base_path: String,
        inner: &str,
    ) -> FilesystemView<'_> {
        let sub_dir = if inner.is_empty() {
            String::new()
        } else {
            let mut tree = crate::tree::DirectoryTree::new("");
            match tree.resolve_dir(backend.as_ref(), inner) {
                Some(dir) => dir,
                None => {
                    tracing::debug!(inner, "sub directory not found in container");
                    return FilesystemView::default();
                }
            }
        };

        let handle = FsHandle(self.nodes.borrow().len());
        let fs = Filesystem::new(handle, parent.map(|p| p.handle()), backend, base_path, &sub_dir);
        if !fs.is_valid() {
            return FilesystemView::default();
        }
        tracing::debug!(
            handle = handle.0,
            backend = fs.backend_name(),
            path = fs.path(),
            "mounted filesystem"
        );
        if let Some(parent) = parent {
            parent.add_child(handle);
        }
        self.nodes.borrow_mut().push(Some(fs));
        FilesystemView::new(self, handle, String::new())
    }
}

impl fmt::Debug for Vfs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vfs")
            .field("filesystems", &self.len())
            .field(
                "recognizers",
                &self.recognizers.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
