//! Streams handed out by filesystems.

use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::rc::Weak;

use crate::Filesystem;
use crate::core::ReadSeek;

/// A buffered, seekable input stream.
pub struct InputStream {
    inner: BufReader<Box<dyn ReadSeek>>,
    name: String,
}

impl InputStream {
    pub(crate) fn new(inner: Box<dyn ReadSeek>, name: String) -> Self {
        Self {
            inner: BufReader::new(inner),
            name,
        }
    }

    /// Path the stream was opened with, as resolved inside its filesystem.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total length of the stream. The position is preserved.
    pub fn size(&mut self) -> io::Result<u64> {
        let pos = self.inner.stream_position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(end)
    }

    /// Reads the remaining bytes.
    pub fn read_to_vec(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.inner.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl fmt::Debug for InputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputStream")
            .field("name", &self.name)
            .finish()
    }
}

impl Read for InputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for InputStream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

impl Seek for InputStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// An output stream bound to the filesystem that opened it.
///
/// Closing the stream, explicitly with `close` or implicitly on drop, flushes
/// it and clears the directory cache of its filesystem, so that later lookups
/// observe the write.
pub struct OutputStream {
    inner: Option<Box<dyn Write>>,
    name: String,
    owner: Weak<Filesystem>,
}

impl OutputStream {
    pub(crate) fn new(inner: Box<dyn Write>, name: String, owner: Weak<Filesystem>) -> Self {
        Self {
            inner: Some(inner),
            name,
            owner,
        }
    }

    /// Path the stream was opened with, as resolved inside its filesystem.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flushes and closes the stream, reporting a flush failure.
    pub fn close(mut self) -> io::Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> io::Result<()> {
        let Some(mut inner) = self.inner.take() else {
            return Ok(());
        };
        let result = inner.flush();
        drop(inner);
        if let Some(owner) = self.owner.upgrade() {
            owner.clear_cache();
        }
        result
    }

    fn writer(&mut self) -> io::Result<&mut Box<dyn Write>> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::other("stream is closed"))
    }
}

impl fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputStream")
            .field("name", &self.name)
            .field("open", &self.inner.is_some())
            .finish()
    }
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            tracing::warn!(name = %self.name, error = %e, "failed to flush output stream");
        }
    }
}
