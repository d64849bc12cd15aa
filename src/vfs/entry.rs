#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EntryType {
    File,
    Directory,
}

/// One child of a directory listing: its true (backend) name and its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: String,
    entry_type: EntryType,
}

impl DirEntry {
    pub fn new<S: Into<String>>(name: S, entry_type: EntryType) -> DirEntry {
        DirEntry {
            name: name.into(),
            entry_type,
        }
    }

    pub fn file<S: Into<String>>(name: S) -> DirEntry {
        Self::new(name, EntryType::File)
    }

    pub fn dir<S: Into<String>>(name: S) -> DirEntry {
        Self::new(name, EntryType::Directory)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}
