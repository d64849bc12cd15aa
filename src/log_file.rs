//! A log file kept inside a filesystem view.
//!
//! Messages written before the destination is known are buffered in memory
//! and flushed once a view is attached. Every message is also emitted as a
//! `tracing` event, so nothing is lost when no view is ever attached.

use std::fmt;
use std::io::{BufRead, Read, Seek, SeekFrom, Write};

use anyhow::{Context, anyhow};

use crate::core::{OpenMode, Result};
use crate::stream::OutputStream;
use crate::view::FilesystemView;

/// Default size the log is trimmed to by [`LogFile::finish`].
pub const DEFAULT_LIMIT: u64 = 100 * 1024;

const TIMESTAMP_FORMAT: &str = "[%Y-%m-%d %H:%M:%S] ";

/// Severity of a log message, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Debug,
}

impl Severity {
    pub fn prefix(&self) -> &'static str {
        match self {
            Severity::Error => "Error: ",
            Severity::Warning => "Warning: ",
            Severity::Info => "Info: ",
            Severity::Debug => "Debug: ",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix().trim_end_matches([':', ' ']))
    }
}

#[derive(Debug)]
struct LastMessage {
    severity: Severity,
    msg: String,
    repeat: usize,
}

/// Log file with an explicit lifecycle: buffer, [`attach`](Self::attach),
/// [`finish`](Self::finish).
///
/// A message repeated back to back is written once; when a different message
/// arrives, the repeated one is written again as `msg [Nx]`.
///
/// ```
/// use asset_vfs::{MapFS, Vfs};
/// use asset_vfs::log_file::{LogFile, Severity};
///
/// let vfs = Vfs::new();
/// let save = vfs.mount(Box::new(MapFS::new()), "save");
///
/// let mut log = LogFile::new("game.log");
/// log.write(Severity::Info, "starting").unwrap();
/// log.attach(save.clone()).unwrap();
/// log.finish().unwrap();
/// assert!(save.exists("GAME.LOG"));
/// ```
#[derive(Debug)]
pub struct LogFile<'a> {
    filename: String,
    level: Severity,
    limit: u64,
    buffer: Vec<String>,
    last: Option<LastMessage>,
    view: FilesystemView<'a>,
    stream: Option<OutputStream>,
}

impl<'a> LogFile<'a> {
    pub fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            level: Severity::Debug,
            limit: DEFAULT_LIMIT,
            buffer: Vec::new(),
            last: None,
            view: FilesystemView::default(),
            stream: None,
        }
    }

    /// Discards messages less severe than `level`.
    pub fn set_level(&mut self, level: Severity) {
        self.level = level;
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    /// Size the file is trimmed to on `finish`.
    pub fn set_limit(&mut self, limit: u64) {
        self.limit = limit;
    }

    pub fn is_attached(&self) -> bool {
        self.stream.is_some()
    }

    /// Records a message.
    pub fn write(&mut self, severity: Severity, msg: &str) -> Result<()> {
        if severity > self.level {
            return Ok(());
        }
        match severity {
            Severity::Error => tracing::error!("{msg}"),
            Severity::Warning => tracing::warn!("{msg}"),
            Severity::Info => tracing::info!("{msg}"),
            Severity::Debug => tracing::debug!("{msg}"),
        }

        let Some(stream) = self.stream.as_mut() else {
            self.buffer.push(format!("{}{msg}", severity.prefix()));
            return Ok(());
        };

        if let Some(last) = self.last.as_mut().filter(|last| last.msg == msg) {
            last.repeat += 1;
            return Ok(());
        }
        if let Some(last) = self.last.take().filter(|last| last.repeat > 0) {
            write_line(stream, &repeated(&last))?;
        }
        write_line(stream, &format!("{}{msg}", severity.prefix()))?;
        self.last = Some(LastMessage {
            severity,
            msg: msg.to_string(),
            repeat: 0,
        });
        Ok(())
    }

    /// Opens the log inside `view` for appending and flushes the buffer.
    pub fn attach(&mut self, view: FilesystemView<'a>) -> Result<()> {
        let mut stream = view
            .open_output_stream(&self.filename, OpenMode::append())
            .ok_or_else(|| anyhow!("cannot open log file {}", view.full_path(&self.filename)))?;

        for line in self.buffer.drain(..) {
            write_line(&mut stream, &line)?;
        }
        stream.flush()?;
        tracing::debug!(file = %view.full_path(&self.filename), "log file attached");

        self.view = view;
        self.stream = Some(stream);
        Ok(())
    }

    /// Closes the log and trims it to its last `limit` bytes, cut at a line
    /// boundary.
    pub fn finish(mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        if let Some(last) = self.last.take().filter(|last| last.repeat > 0) {
            write_line(&mut stream, &repeated(&last))?;
        }
        stream.close()?;
        self.truncate()
    }

    fn truncate(&self) -> Result<()> {
        let Some(mut input) = self.view.open_input_stream(&self.filename, OpenMode::input()) else {
            return Ok(());
        };
        let size = input.size()?;
        if size <= self.limit {
            return Ok(());
        }

        let offset = i64::try_from(self.limit).context("log limit too large")?;
        input.seek(SeekFrom::End(-offset))?;
        // the window starts in the middle of a line
        let mut partial = Vec::new();
        input.read_until(b'\n', &mut partial)?;
        let mut tail = Vec::new();
        input.read_to_end(&mut tail)?;
        drop(input);

        let mut out = self
            .view
            .open_output_stream(&self.filename, OpenMode::output())
            .ok_or_else(|| anyhow!("cannot rewrite log file {}", self.filename))?;
        out.write_all(&tail)?;
        out.close()?;
        tracing::debug!(from = size, to = tail.len(), "log file trimmed");
        Ok(())
    }
}

fn repeated(last: &LastMessage) -> String {
    format!("{}{} [{}x]", last.severity.prefix(), last.msg, last.repeat + 1)
}

fn write_line(stream: &mut OutputStream, line: &str) -> std::io::Result<()> {
    let stamp = chrono::Local::now().format(TIMESTAMP_FORMAT);
    writeln!(stream, "{stamp}{line}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MapFS, Vfs};

    fn read_lines(view: &FilesystemView<'_>, name: &str) -> Vec<String> {
        let content = view
            .open_input_stream(name, OpenMode::input())
            .unwrap()
            .read_to_vec()
            .unwrap();
        String::from_utf8(content)
            .unwrap()
            .lines()
            .map(|line| match line.split_once("] ") {
                Some((_, rest)) => rest.to_string(),
                None => line.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_buffer_until_attached() -> Result<()> {
        let vfs = Vfs::new();
        let save = vfs.mount(Box::new(MapFS::new()), "save");
        let mut log = LogFile::new("easy.log");
        log.write(Severity::Error, "early")?;
        log.write(Severity::Debug, "details")?;
        assert!(!save.exists("easy.log"));

        log.attach(save.clone())?;
        assert!(log.is_attached());
        log.write(Severity::Info, "late")?;
        log.finish()?;

        assert_eq!(read_lines(&save, "EASY.LOG"), ["Error: early", "Debug: details", "Info: late"]);
        Ok(())
    }

    #[test]
    fn test_timestamp_format() -> Result<()> {
        let vfs = Vfs::new();
        let save = vfs.mount(Box::new(MapFS::new()), "save");
        let mut log = LogFile::new("easy.log");
        log.attach(save.clone())?;
        log.write(Severity::Info, "x")?;
        log.finish()?;

        let raw = String::from_utf8(save.open_input_stream("easy.log", OpenMode::input()).unwrap().read_to_vec()?)?;
        let line = raw.lines().next().unwrap();
        // [YYYY-MM-DD HH:MM:SS] Info: x
        assert_eq!(line.len(), 22 + "Info: x".len());
        assert!(line.starts_with('['));
        assert_eq!(&line[20..22], "] ");
        Ok(())
    }

    #[test]
    fn test_repeated_messages_collapse() -> Result<()> {
        let vfs = Vfs::new();
        let save = vfs.mount(Box::new(MapFS::new()), "save");
        let mut log = LogFile::new("easy.log");
        log.attach(save.clone())?;
        for msg in ["a", "a", "a", "b", "c", "c"] {
            log.write(Severity::Warning, msg)?;
        }
        log.finish()?;

        assert_eq!(
            read_lines(&save, "easy.log"),
            ["Warning: a", "Warning: a [3x]", "Warning: b", "Warning: c", "Warning: c [2x]"]
        );
        Ok(())
    }

    #[test]
    fn test_level_filter() -> Result<()> {
        let vfs = Vfs::new();
        let save = vfs.mount(Box::new(MapFS::new()), "save");
        let mut log = LogFile::new("easy.log");
        log.set_level(Severity::Warning);
        log.attach(save.clone())?;
        log.write(Severity::Debug, "hidden")?;
        log.write(Severity::Info, "hidden")?;
        log.write(Severity::Error, "shown")?;
        log.finish()?;

        assert_eq!(read_lines(&save, "easy.log"), ["Error: shown"]);
        Ok(())
    }

    #[test]
    fn test_finish_trims_at_line_boundary() -> Result<()> {
        let vfs = Vfs::new();
        let save = vfs.mount(Box::new(MapFS::new()), "save");
        let mut log = LogFile::new("easy.log");
        log.set_limit(100);
        log.attach(save.clone())?;
        for i in 0..20 {
            log.write(Severity::Info, &format!("message {i}"))?;
        }
        log.finish()?;

        assert!(save.file_size("easy.log") <= 100);
        let lines = read_lines(&save, "easy.log");
        assert_eq!(lines.last().unwrap(), "Info: message 19");
        assert!(lines.iter().all(|l| l.starts_with("Info: message ")));
        Ok(())
    }

    #[test]
    fn test_attach_appends() -> Result<()> {
        let vfs = Vfs::new();
        let save = vfs.mount(Box::new(MapFS::new()), "save");
        for run in ["first", "second"] {
            let mut log = LogFile::new("easy.log");
            log.attach(save.clone())?;
            log.write(Severity::Info, run)?;
            log.finish()?;
        }
        assert_eq!(read_lines(&save, "easy.log"), ["Info: first", "Info: second"]);
        Ok(())
    }

    #[test]
    fn test_attach_to_invalid_view_fails() {
        let mut log = LogFile::new("easy.log");
        log.write(Severity::Info, "kept").unwrap();
        assert!(log.attach(FilesystemView::default()).is_err());
        assert!(!log.is_attached());
        assert!(log.finish().is_ok());
    }
}
