//! A case-insensitive virtual filesystem for game assets.
//! Lets an application address files by logical path, whatever their real
//! case on disk and whether they live in a directory or inside an archive.
//!
//! ### Overview
//!
//! `asset-vfs` puts every storage origin behind the [`Backend`] trait and
//! resolves logical paths through a per-filesystem [`DirectoryTree`] cache,
//! so `Title/TITLE.PNG` finds `title/Title.png` on any host. Filesystems live
//! in a [`Vfs`] arena; consumers hold [`FilesystemView`]s.
//!
//! **Key ideas**:
//! - **Case-insensitivity**: names are folded with Unicode lowercase mapping on both
//!   sides of every lookup; the true backend name is what reaches the backend.
//! - **Polymorphic storage**: native directories (`DirFS`), in-memory maps (`MapFS`),
//!   and tar / tar.gz archives, recognized in a fixed priority order.
//! - **Mounting**: an archive found inside a filesystem becomes its child, and
//!   releasing a filesystem releases its children.
//! - **Absence is normal**: missing files answer `false`, `-1` or `None`, never panic.
//!
//! ### Example
//!
//! ```no_run
//! use asset_vfs::{OpenMode, Vfs};
//! use std::io::Write;
//!
//! let vfs = Vfs::new();
//! let game = vfs.create("/games/my_game");
//! let title = game.find_file_in("Title", "title", &[".png", ".bmp"]);
//!
//! let save = game.subtree("Save");
//! if let Some(mut out) = save.open_output_stream("Save01.lsd", OpenMode::output()) {
//!     out.write_all(b"LcfSaveData").unwrap();
//! }
//! assert!(save.exists("SAVE01.LSD") || title.is_none());
//! ```

mod core;
mod filesystem;
pub mod log_file;
mod mount;
mod stream;
mod tree;
mod view;
mod vfs;

pub use crate::core::{Backend, OpenMode, ReadSeek, Result, VfsError, VfsResult, utils};
pub use filesystem::Filesystem;
pub use log_file::{LogFile, Severity};
pub use mount::{
    DirectoryRecognizer, FsHandle, HostSource, Location, Recognizer, Source, TarGzRecognizer,
    TarRecognizer, Vfs, default_recognizers,
};
pub use stream::{InputStream, OutputStream};
pub use tree::{DirectoryTree, FindArgs};
pub use vfs::tar_fs;
pub use vfs::{DirEntry, DirFS, EntryType, MapFS};
pub use view::FilesystemView;
