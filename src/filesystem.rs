//! The owning filesystem: one backend, one directory tree, one root.

use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::{Rc, Weak};

use crate::core::{Backend, OpenMode, VfsError, VfsResult};
use crate::mount::FsHandle;
use crate::stream::{InputStream, OutputStream};
use crate::tree::{DirectoryTree, FindArgs};
use crate::{DirEntry, EntryType};

/// A filesystem bound to one backend instance.
///
/// Every path-taking operation first resolves the logical path through the
/// case-insensitive directory tree and only then calls the backend with the
/// true, backend-native path. A path that does not resolve is simply absent:
/// queries answer `false`, `-1` or `None`.
///
/// Filesystems live in a [`Vfs`](crate::Vfs) arena and are reached through
/// [`FilesystemView`](crate::FilesystemView)s.
pub struct Filesystem {
    handle: FsHandle,
    parent: Option<FsHandle>,
    backend: Box<dyn Backend>,
    tree: RefCell<DirectoryTree>,
    base_path: String,
    valid: bool,
    children: RefCell<Vec<FsHandle>>,
    this: Weak<Filesystem>,
}

impl Filesystem {
    /// `sub_dir` is a true-case directory inside the backend that becomes the
    /// root of this filesystem.
    pub(crate) fn new(
        handle: FsHandle,
        parent: Option<FsHandle>,
        backend: Box<dyn Backend>,
        base_path: String,
        sub_dir: &str,
    ) -> Rc<Self> {
        let tree = DirectoryTree::new(sub_dir);
        let valid = backend.is_directory(tree.root(), true);
        Rc::new_cyclic(|this| Self {
            handle,
            parent,
            backend,
            tree: RefCell::new(tree),
            base_path,
            valid,
            children: RefCell::new(Vec::new()),
            this: this.clone(),
        })
    }

    /// True if the root of this filesystem was found in its backend.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The path used to create this filesystem. Creating a filesystem from it
    /// again, in the same place, yields an equivalent root.
    pub fn path(&self) -> &str {
        &self.base_path
    }

    /// Offset of the root inside the backend.
    pub fn sub_dir(&self) -> String {
        self.tree.borrow().root().to_string()
    }

    pub fn handle(&self) -> FsHandle {
        self.handle
    }

    pub fn parent(&self) -> Option<FsHandle> {
        self.parent
    }

    /// Filesystems mounted from inside this one.
    pub fn children(&self) -> Vec<FsHandle> {
        self.children.borrow().clone()
    }

    pub(crate) fn add_child(&self, child: FsHandle) {
        self.children.borrow_mut().push(child);
    }

    pub(crate) fn remove_child(&self, child: FsHandle) {
        self.children.borrow_mut().retain(|&h| h != child);
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(|p| self.backend.is_file(&p))
    }

    pub fn is_directory(&self, path: &str, follow_symlinks: bool) -> bool {
        self.resolve(path)
            .is_some_and(|p| self.backend.is_directory(&p, follow_symlinks))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(|p| self.backend.exists(&p))
    }

    /// Size of a file in bytes, `-1` if it is missing or not a file.
    pub fn file_size(&self, path: &str) -> i64 {
        self.resolve(path)
            .map_or(-1, |p| self.backend.file_size(&p))
    }

    /// Host path backing `path`, for filesystems that map to the host.
    pub fn host_path(&self, path: &str) -> Option<PathBuf> {
        self.resolve(path).and_then(|p| self.backend.host_path(&p))
    }

    /// Opens a file for reading; `None` when it cannot be opened.
    pub fn open_input_stream(&self, path: &str, mode: OpenMode) -> Option<InputStream> {
        self.try_open_input_stream(path, mode)
            .inspect_err(|e| tracing::trace!(path, error = %e, "cannot open input"))
            .ok()
    }

    /// Like `open_input_stream`, telling a missing file apart from a failure.
    pub fn try_open_input_stream(&self, path: &str, mode: OpenMode) -> VfsResult<InputStream> {
        if !self.valid {
            return Err(VfsError::Unavailable);
        }
        let (resolved, kind) = self
            .resolve_entry(path)
            .ok_or_else(|| VfsError::not_found(path))?;
        if kind == EntryType::Directory {
            return Err(VfsError::is_a_directory(path));
        }
        let backend_path = self.tree.borrow().backend_path(&resolved);
        let stream = self.backend.create_input_stream(&backend_path, mode)?;
        Ok(InputStream::new(stream, resolved))
    }

    /// Opens a file for writing; `None` when it cannot be opened.
    ///
    /// Parent directories that already exist are matched case-insensitively,
    /// the rest of the path is created as given.
    pub fn open_output_stream(&self, path: &str, mode: OpenMode) -> Option<OutputStream> {
        self.try_open_output_stream(path, mode)
            .inspect_err(|e| tracing::debug!(path, error = %e, "cannot open output"))
            .ok()
    }

    pub fn try_open_output_stream(&self, path: &str, mode: OpenMode) -> VfsResult<OutputStream> {
        if !self.valid {
            return Err(VfsError::Unavailable);
        }
        let resolved = self
            .tree
            .borrow_mut()
            .resolve_for_write(self.backend.as_ref(), path)
            .ok_or_else(|| VfsError::invalid_path(path))?;
        let backend_path = self.tree.borrow().backend_path(&resolved);
        let stream = self.backend.create_output_stream(&backend_path, mode)?;
        Ok(OutputStream::new(stream, resolved, self.this.clone()))
    }

    /// Lists a directory. `None` when it cannot be enumerated, which is
    /// different from `Some(vec![])` for an empty directory.
    pub fn list_directory(&self, path: &str) -> Option<Vec<DirEntry>> {
        self.try_list_directory(path).ok()
    }

    pub fn try_list_directory(&self, path: &str) -> VfsResult<Vec<DirEntry>> {
        if !self.valid {
            return Err(VfsError::Unavailable);
        }
        self.tree
            .borrow_mut()
            .list_directory(self.backend.as_ref(), path)
    }

    /// Drops the directory cache. Happens automatically when an output
    /// stream of this filesystem is closed.
    pub fn clear_cache(&self) {
        self.tree.borrow_mut().clear();
    }

    /// Case-insensitive search for `filename`, probing `exts` in order.
    ///
    /// Returns the true path relative to this filesystem's root.
    pub fn find_file(&self, filename: &str, exts: &[&str]) -> Option<String> {
        self.find_file_with(&FindArgs::new(filename).with_exts(exts))
    }

    /// Case-insensitive search for `filename` inside `directory`.
    pub fn find_file_in(&self, directory: &str, filename: &str, exts: &[&str]) -> Option<String> {
        self.find_file_with(&FindArgs::new(filename).in_directory(directory).with_exts(exts))
    }

    /// Search with the full argument bundle.
    pub fn find_file_with(&self, args: &FindArgs<'_>) -> Option<String> {
        if !self.valid {
            return None;
        }
        self.tree
            .borrow_mut()
            .find(self.backend.as_ref(), args)
            .map(|(path, _)| path)
    }

    /// True path of an existing entry relative to the root, with its kind.
    pub(crate) fn resolve_entry(&self, path: &str) -> Option<(String, EntryType)> {
        if !self.valid {
            return None;
        }
        self.tree.borrow_mut().resolve(self.backend.as_ref(), path)
    }

    /// Backend-native path of an existing entry.
    fn resolve(&self, path: &str) -> Option<String> {
        let (resolved, _) = self.resolve_entry(path)?;
        Some(self.tree.borrow().backend_path(&resolved))
    }
}

impl fmt::Debug for Filesystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filesystem")
            .field("handle", &self.handle)
            .field("backend", &self.backend.name())
            .field("base_path", &self.base_path)
            .field("valid", &self.valid)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MapFS;
    use std::io::{Read, Write};

    fn setup_fs() -> Rc<Filesystem> {
        let map = MapFS::new();
        map.mkfile("Img/Title.png", Some(b"png")).unwrap();
        map.mkfile("Img/Title.BMP", Some(b"bmp")).unwrap();
        map.mkdir("Save").unwrap();
        Filesystem::new(FsHandle::new(0), None, Box::new(map), "memory".into(), "")
    }

    mod queries {
        use super::*;

        #[test]
        fn test_queries_are_case_insensitive() {
            let fs = setup_fs();
            assert!(fs.is_valid());
            assert!(fs.is_file("img/title.png"));
            assert!(fs.is_directory("IMG", true));
            assert!(fs.exists("IMG/TITLE.BMP"));
            assert_eq!(fs.file_size("img/TITLE.png"), 3);
        }

        #[test]
        fn test_absent_values() {
            let fs = setup_fs();
            assert!(!fs.is_file("missing"));
            assert!(!fs.is_directory("img/title.png", true));
            assert!(!fs.exists("missing/deeper"));
            assert_eq!(fs.file_size("missing"), -1);
            assert_eq!(fs.file_size("img"), -1);
            assert!(fs.open_input_stream("missing", OpenMode::input()).is_none());
            assert!(fs.list_directory("missing").is_none());
        }

        #[test]
        fn test_find_file_overloads() {
            let fs = setup_fs();
            assert_eq!(fs.find_file("IMG/TITLE.PNG", &[]).unwrap(), "Img/Title.png");
            assert_eq!(
                fs.find_file_in("img", "title.png", &[]),
                fs.find_file("IMG/TITLE.PNG", &[])
            );
            assert_eq!(
                fs.find_file_with(&FindArgs::new("title").in_directory("img").with_exts(&[".bmp"])),
                Some("Img/Title.BMP".to_string())
            );
        }

        #[test]
        fn test_invalid_root() {
            let map = MapFS::new();
            let fs = Filesystem::new(FsHandle::new(0), None, Box::new(map), "m".into(), "missing");
            assert!(!fs.is_valid());
            assert!(!fs.exists(""));
            assert!(fs.find_file("anything", &[]).is_none());
            assert!(matches!(fs.try_list_directory(""), Err(VfsError::Unavailable)));
            assert!(fs.open_output_stream("x", OpenMode::output()).is_none());
        }

        #[test]
        fn test_sub_dir_root() {
            let map = MapFS::new();
            map.mkfile("Game/Data/Map0001.lmu", Some(b"map")).unwrap();
            let fs = Filesystem::new(FsHandle::new(0), None, Box::new(map), "m".into(), "Game");
            assert_eq!(fs.sub_dir(), "Game");
            assert_eq!(fs.find_file("data/map0001.LMU", &[]).unwrap(), "Data/Map0001.lmu");
            assert_eq!(fs.file_size("DATA/MAP0001.LMU"), 3);
        }
    }

    mod streams {
        use super::*;

        #[test]
        fn test_write_visible_without_explicit_clear() -> std::io::Result<()> {
            let fs = setup_fs();
            assert!(!fs.exists("save/save.dat"));

            let mut out = fs.open_output_stream("SAVE/save.dat", OpenMode::output()).unwrap();
            assert_eq!(out.name(), "Save/save.dat");
            out.write_all(b"state")?;
            out.close()?;

            assert!(fs.exists("save/save.dat"));
            let mut content = Vec::new();
            fs.open_input_stream("Save/Save.DAT", OpenMode::input())
                .unwrap()
                .read_to_end(&mut content)?;
            assert_eq!(content, b"state");
            Ok(())
        }

        #[test]
        fn test_drop_also_clears_cache() {
            let fs = setup_fs();
            assert!(fs.find_file("new.txt", &[]).is_none());
            {
                let _out = fs.open_output_stream("new.txt", OpenMode::output()).unwrap();
            }
            assert_eq!(fs.find_file("NEW.TXT", &[]).unwrap(), "new.txt");
        }

        #[test]
        fn test_overwrite_keeps_true_case() -> std::io::Result<()> {
            let fs = setup_fs();
            let mut out = fs.open_output_stream("img/title.png", OpenMode::output()).unwrap();
            assert_eq!(out.name(), "Img/Title.png");
            out.write_all(b"new")?;
            out.close()?;
            assert_eq!(fs.list_directory("img").unwrap().len(), 2);
            Ok(())
        }

        #[test]
        fn test_input_stream_on_directory() {
            let fs = setup_fs();
            assert!(matches!(
                fs.try_open_input_stream("img", OpenMode::input()),
                Err(VfsError::IsADirectory(_))
            ));
            assert!(
                fs.try_open_input_stream("missing", OpenMode::input())
                    .unwrap_err()
                    .is_not_found()
            );
        }

        #[test]
        fn test_binary_round_trip() -> std::io::Result<()> {
            let fs = setup_fs();
            let data: Vec<u8> = (0..=255u8).chain([b'\r', b'\n', b'\n', 0x1a, 0]).collect();

            let mut out = fs.open_output_stream("blob.bin", OpenMode::output()).unwrap();
            out.write_all(&data)?;
            out.close()?;

            let back = fs
                .open_input_stream("BLOB.BIN", OpenMode::input())
                .unwrap()
                .read_to_vec()?;
            assert_eq!(back, data);
            Ok(())
        }
    }
}
