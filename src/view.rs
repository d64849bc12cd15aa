//! Non-owning handles into a filesystem.

use std::rc::Rc;

use crate::core::{OpenMode, VfsError, VfsResult, utils};
use crate::mount::FsHandle;
use crate::stream::{InputStream, OutputStream};
use crate::tree::FindArgs;
use crate::{DirEntry, Filesystem, Vfs};

/// A cheap handle on a subtree of a filesystem.
///
/// Views are what consumers hold. A view borrows the [`Vfs`] that owns its
/// filesystem and checks on every call that the filesystem is still alive:
/// once it is released, the view behaves like an invalid one.
///
/// Every path is qualified with the view's sub path before it is handed to
/// the filesystem, so a view on `Save` resolves `save01.lsd` as
/// `Save/save01.lsd`.
///
/// # Example
///
/// ```no_run
/// use asset_vfs::{OpenMode, Vfs};
///
/// let vfs = Vfs::new();
/// let game = vfs.create("/games/my_game");
/// let music = game.subtree("Music");
/// if let Some(mut theme) = music.open_file("theme", &[".mid", ".ogg"]) {
///     println!("{} bytes", theme.size().unwrap_or(0));
/// }
/// let save = game.open_output_stream("Save01.lsd", OpenMode::output());
/// assert!(save.is_some() || !game.is_valid());
/// ```
///
/// # Notes
///
/// - A default view is invalid; every operation on it fails without panicking.
/// - `subtree` never touches the mount graph. `create` may register a new
///   filesystem as a child of this one.
#[derive(Debug, Clone, Default)]
pub struct FilesystemView<'a> {
    owner: Option<(&'a Vfs, FsHandle)>,
    sub_path: String,
}

impl<'a> FilesystemView<'a> {
    pub(crate) fn new(vfs: &'a Vfs, handle: FsHandle, sub_path: String) -> Self {
        Self {
            owner: Some((vfs, handle)),
            sub_path: utils::normalize(&sub_path),
        }
    }

    /// True while the owning filesystem is alive and valid.
    pub fn is_valid(&self) -> bool {
        self.filesystem().is_some()
    }

    /// The owning filesystem, if it is still alive.
    pub fn filesystem(&self) -> Option<Rc<Filesystem>> {
        let (vfs, handle) = self.owner?;
        vfs.get(handle).filter(|fs| fs.is_valid())
    }

    /// Offset of this view inside its filesystem.
    pub fn sub_path(&self) -> &str {
        &self.sub_path
    }

    /// Qualifies `path` with the sub path. Pure string work.
    pub fn make_path(&self, path: &str) -> String {
        utils::join(&self.sub_path, path)
    }

    /// Base path of the filesystem joined with the qualified `path`, for
    /// messages.
    pub fn full_path(&self, path: &str) -> String {
        match self.filesystem() {
            Some(fs) if !fs.path().is_empty() => format!("{}/{}", fs.path(), self.make_path(path)),
            _ => self.make_path(path),
        }
    }

    /// A view further down the same filesystem.
    pub fn subtree(&self, path: &str) -> FilesystemView<'a> {
        match self.owner {
            Some((vfs, handle)) if self.is_valid() => Self::new(vfs, handle, self.make_path(path)),
            _ => Self::default(),
        }
    }

    /// Recognizes `path` inside this view and mounts what it finds.
    ///
    /// Containers (archives) become child filesystems of the owning one.
    /// Returns an invalid view when nothing recognizes the path.
    pub fn create(&self, path: &str) -> FilesystemView<'a> {
        let (Some((vfs, _)), Some(fs)) = (self.owner, self.filesystem()) else {
            return Self::default();
        };
        vfs.create_in(&fs, &self.make_path(path))
    }

    /// Case-insensitive search; see [`Filesystem::find_file`].
    ///
    /// The result is relative to the filesystem root, not to this view.
    pub fn find_file(&self, filename: &str, exts: &[&str]) -> Option<String> {
        self.find_file_with(&FindArgs::new(filename).with_exts(exts))
    }

    pub fn find_file_in(&self, directory: &str, filename: &str, exts: &[&str]) -> Option<String> {
        self.find_file_with(&FindArgs::new(filename).in_directory(directory).with_exts(exts))
    }

    pub fn find_file_with(&self, args: &FindArgs<'_>) -> Option<String> {
        let fs = self.filesystem()?;
        let directory = self.make_path(args.directory);
        fs.find_file_with(&FindArgs {
            directory: &directory,
            ..*args
        })
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.filesystem().is_some_and(|fs| fs.is_file(&self.make_path(path)))
    }

    pub fn is_directory(&self, path: &str, follow_symlinks: bool) -> bool {
        self.filesystem()
            .is_some_and(|fs| fs.is_directory(&self.make_path(path), follow_symlinks))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.filesystem().is_some_and(|fs| fs.exists(&self.make_path(path)))
    }

    /// Size in bytes, `-1` when missing, not a file, or the view is invalid.
    pub fn file_size(&self, path: &str) -> i64 {
        self.filesystem()
            .map_or(-1, |fs| fs.file_size(&self.make_path(path)))
    }

    /// Lists a directory; `None` when it cannot be enumerated.
    pub fn list_directory(&self, path: &str) -> Option<Vec<DirEntry>> {
        self.try_list_directory(path).ok()
    }

    pub fn try_list_directory(&self, path: &str) -> VfsResult<Vec<DirEntry>> {
        self.filesystem()
            .ok_or(VfsError::Unavailable)?
            .try_list_directory(&self.make_path(path))
    }

    pub fn open_input_stream(&self, path: &str, mode: OpenMode) -> Option<InputStream> {
        self.filesystem()?
            .open_input_stream(&self.make_path(path), mode)
    }

    pub fn open_output_stream(&self, path: &str, mode: OpenMode) -> Option<OutputStream> {
        self.filesystem()?
            .open_output_stream(&self.make_path(path), mode)
    }

    /// Finds `filename` (probing `exts`) and opens it for reading.
    pub fn open_file(&self, filename: &str, exts: &[&str]) -> Option<InputStream> {
        let fs = self.filesystem()?;
        let found = self.find_file_with(&FindArgs::new(filename).with_exts(exts).warn_not_found(true))?;
        fs.open_input_stream(&found, OpenMode::input())
    }
}
