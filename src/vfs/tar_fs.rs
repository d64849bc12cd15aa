//! Loading of tar and gzip-compressed tar archives into read-only `MapFS` backends.
//!
//! Archives are indexed once, when they are mounted; the resulting map never
//! touches the archive again. Only regular files and directories are kept,
//! other entry kinds (links, devices, fifos) are skipped.

use std::io::Read;

use anyhow::Context;
use flate2::read::GzDecoder;
use tar::Archive;

use crate::MapFS;
use crate::core::{Backend, Result, utils};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const USTAR_MAGIC_OFFSET: usize = 257;

/// Returns true if `head` starts like a gzip stream.
pub fn is_gzip(head: &[u8]) -> bool {
    head.starts_with(&GZIP_MAGIC)
}

/// Returns true if `head` carries a POSIX/GNU tar header magic.
pub fn is_tar(head: &[u8]) -> bool {
    head.get(USTAR_MAGIC_OFFSET..USTAR_MAGIC_OFFSET + 5) == Some(b"ustar".as_slice())
}

/// Reads a plain tar archive into a frozen `MapFS`.
pub fn load_tar<R: Read>(reader: R) -> Result<MapFS> {
    index_archive(Archive::new(reader))
}

/// Reads a gzip-compressed tar archive into a frozen `MapFS`.
pub fn load_tar_gz<R: Read>(reader: R) -> Result<MapFS> {
    index_archive(Archive::new(GzDecoder::new(reader)))
}

fn index_archive<R: Read>(mut archive: Archive<R>) -> Result<MapFS> {
    let mut fs = MapFS::new();
    let mut files = 0usize;

    for entry in archive.entries().context("Failed to read archive entries")? {
        let mut entry = entry.context("Failed to read archive entry")?;
        let path = {
            let raw_path = entry.path().context("Invalid entry path")?;
            match raw_path.to_str() {
                Some(p) => utils::normalize(p),
                None => {
                    tracing::trace!("skipping non UTF-8 archive entry");
                    continue;
                }
            }
        };
        if path.is_empty() {
            continue;
        }

        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            if !fs.is_directory(&path, false) {
                fs.mkdir(&path)
                    .with_context(|| format!("Failed to add directory {path}"))?;
            }
        } else if entry_type.is_file() {
            let mut content = Vec::new();
            entry
                .read_to_end(&mut content)
                .with_context(|| format!("Failed to read {path}"))?;
            // later entries replace earlier ones, as when extracting
            if fs.exists(&path) {
                fs.rm(&path)?;
            }
            fs.mkfile(&path, Some(&content))
                .with_context(|| format!("Failed to add file {path}"))?;
            files += 1;
        } else {
            tracing::trace!(%path, ?entry_type, "skipping archive entry");
        }
    }

    tracing::debug!(files, "indexed archive");
    fs.set_read_only(true);
    Ok(fs)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::core::{OpenMode, VfsError};

    #[test]
    fn test_load_tar() -> Result<()> {
        let data = build_tar(&[
            ("Assets/", b""),
            ("Assets/Title.BMP", b"BM.."),
            ("./Music/theme.mid", b"MThd"),
        ]);
        let fs = load_tar(data.as_slice())?;

        assert!(fs.is_read_only());
        assert!(fs.is_directory("Assets", true));
        assert!(fs.is_directory("Music", true));
        assert_eq!(fs.read("Assets/Title.BMP")?, b"BM..");
        assert_eq!(fs.file_size("Music/theme.mid"), 4);
        Ok(())
    }

    #[test]
    fn test_load_tar_gz() -> Result<()> {
        let data = build_tar_gz(&[("save.dat", &[0u8, 1, 2, 255])]);
        assert!(is_gzip(&data));
        let fs = load_tar_gz(data.as_slice())?;
        assert_eq!(fs.read("save.dat")?, vec![0u8, 1, 2, 255]);
        Ok(())
    }

    #[test]
    fn test_later_entry_replaces_earlier() -> Result<()> {
        let data = build_tar(&[("a.txt", b"first"), ("a.txt", b"second")]);
        let fs = load_tar(data.as_slice())?;
        assert_eq!(fs.read("a.txt")?, b"second");
        Ok(())
    }

    #[test]
    fn test_archive_is_read_only() -> Result<()> {
        let fs = load_tar(build_tar(&[("a.txt", b"x")]).as_slice())?;
        assert!(matches!(
            fs.create_output_stream("a.txt", OpenMode::output()),
            Err(VfsError::ReadOnly)
        ));
        Ok(())
    }

    #[test]
    fn test_magic_detection() {
        let data = build_tar(&[("a.txt", b"x")]);
        assert!(is_tar(&data));
        assert!(!is_gzip(&data));
        assert!(!is_tar(b"not an archive"));
    }

    #[test]
    fn test_garbage_gz_fails() {
        assert!(load_tar_gz(b"definitely not gzip".as_slice()).is_err());
    }
}
