//! VFS error types.

use std::io;

use thiserror::Error;

/// Failure reported by a backend or a filesystem.
///
/// `NotFound` is the expected-absence case; the other variants are genuine
/// failures callers may want to tell apart from absence.
#[derive(Debug, Error)]
pub enum VfsError {
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// The backend does not support writes.
    #[error("filesystem is read-only")]
    ReadOnly,

    /// Invalid path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The filesystem is invalid or has been released.
    #[error("filesystem is not available")]
    Unavailable,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VfsError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// True for the expected-absence case, including an I/O `NotFound`.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Maps a host I/O error, keeping "missing" as `NotFound`.
    pub(crate) fn from_io(path: &str, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::not_found(path),
            _ => Self::Io(e),
        }
    }
}

impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            VfsError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            VfsError::ReadOnly => {
                io::Error::new(io::ErrorKind::PermissionDenied, "filesystem is read-only")
            }
            VfsError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::Unavailable => io::Error::other("filesystem is not available"),
            VfsError::Io(e) => e,
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(VfsError::not_found("a").is_not_found());
        assert!(VfsError::from_io("a", io::Error::from(io::ErrorKind::NotFound)).is_not_found());
        assert!(!VfsError::ReadOnly.is_not_found());
        assert!(
            !VfsError::from_io("a", io::Error::from(io::ErrorKind::PermissionDenied))
                .is_not_found()
        );
    }

    #[test]
    fn test_into_io_error() {
        let e: io::Error = VfsError::ReadOnly.into();
        assert_eq!(e.kind(), io::ErrorKind::PermissionDenied);
        let e: io::Error = VfsError::not_found("x").into();
        assert_eq!(e.kind(), io::ErrorKind::NotFound);
    }
}
