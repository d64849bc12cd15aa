mod dir_fs;
mod entry;
mod map_fs;
pub mod tar_fs;

pub use dir_fs::DirFS;
pub use entry::{DirEntry, EntryType};
pub use map_fs::MapFS;
