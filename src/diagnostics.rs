//! Diagnostic codes and the sinks that receive them.
//!
//! Each diagnostic is one line `<source line number>: <code>`. The reader and parser never
//! touch a global logger; they are handed a `DiagnosticSink` by whoever drives the run.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::util::create_with_backoff;

/// Stable diagnostic codes. The textual form is part of the tool's interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCode {
    /// Fatal: required columns are missing from the header.
    MissingColumns,
    /// Field count of a row differs from the header.
    FieldCount,
    /// Date field does not match the configured pattern.
    DateFormat,
    /// Anything else that went wrong while parsing a row.
    Unexpected,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::MissingColumns => "E0001",
            DiagnosticCode::FieldCount => "E0101",
            DiagnosticCode::DateFormat => "E0201",
            DiagnosticCode::Unexpected => "E0000",
        }
    }

    pub fn is_fatal(self) -> bool {
        matches!(self, DiagnosticCode::MissingColumns)
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of per-line diagnostics.
pub trait DiagnosticSink {
    fn report(&mut self, line: u64, code: DiagnosticCode) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn report(&mut self, line: u64, code: DiagnosticCode) -> io::Result<()> {
        (**self).report(line, code)
    }
    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for Box<S> {
    fn report(&mut self, line: u64, code: DiagnosticCode) -> io::Result<()> {
        (**self).report(line, code)
    }
    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Drops every diagnostic.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardSink;

impl DiagnosticSink for DiscardSink {
    #[inline]
    fn report(&mut self, _line: u64, _code: DiagnosticCode) -> io::Result<()> {
        Ok(())
    }
}

/// Writes diagnostics to stderr, separate from the report itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleSink;

impl DiagnosticSink for ConsoleSink {
    fn report(&mut self, line: u64, code: DiagnosticCode) -> io::Result<()> {
        writeln!(io::stderr().lock(), "{}: {}", line, code)
    }
}

/// Writes diagnostics to a side file (truncated on open).
pub struct FileSink {
    path: PathBuf,
    w: BufWriter<File>,
}

impl FileSink {
    pub fn create(path: &Path) -> io::Result<Self> {
        let f = create_with_backoff(path, 16, 50)?;
        Ok(Self { path: path.to_path_buf(), w: BufWriter::new(f) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DiagnosticSink for FileSink {
    fn report(&mut self, line: u64, code: DiagnosticCode) -> io::Result<()> {
        writeln!(self.w, "{}: {}", line, code)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.w.flush()
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        let _ = self.w.flush();
    }
}

/// Keeps diagnostics in memory, in arrival order.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    pub entries: Vec<(u64, DiagnosticCode)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn codes(&self) -> Vec<DiagnosticCode> {
        self.entries.iter().map(|(_, c)| *c).collect()
    }

    /// Rendered `<line>: <code>` lines, as a console or file sink would have written them.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(|(l, c)| format!("{}: {}", l, c)).collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&mut self, line: u64, code: DiagnosticCode) -> io::Result<()> {
        self.entries.push((line, code));
        Ok(())
    }
}

/// Where non-fatal diagnostics go, as picked on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SinkKind {
    #[default]
    Skip,
    Console,
    File,
}

impl FromStr for SinkKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(SinkKind::Skip),
            "console" => Ok(SinkKind::Console),
            "file" => Ok(SinkKind::File),
            other => Err(format!("unknown log mode {:?} (expected skip, console or file)", other)),
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SinkKind::Skip => "skip",
            SinkKind::Console => "console",
            SinkKind::File => "file",
        })
    }
}

/// Build the sink for `kind`. `file_path` is only used by `SinkKind::File`.
pub fn open_sink(kind: SinkKind, file_path: &Path) -> Result<Box<dyn DiagnosticSink>> {
    Ok(match kind {
        SinkKind::Skip => Box::new(DiscardSink),
        SinkKind::Console => Box::new(ConsoleSink),
        SinkKind::File => {
            let sink = FileSink::create(file_path)
                .with_context(|| format!("create diagnostics file {}", file_path.display()))?;
            tracing::info!("Writing parse diagnostics to {}", sink.path().display());
            Box::new(sink)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn codes_render_verbatim() {
        assert_eq!(DiagnosticCode::MissingColumns.to_string(), "E0001");
        assert_eq!(DiagnosticCode::FieldCount.to_string(), "E0101");
        assert_eq!(DiagnosticCode::DateFormat.to_string(), "E0201");
        assert_eq!(DiagnosticCode::Unexpected.to_string(), "E0000");
        assert!(DiagnosticCode::MissingColumns.is_fatal());
        assert!(!DiagnosticCode::FieldCount.is_fatal());
    }

    #[test]
    fn memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        sink.report(4, DiagnosticCode::DateFormat).unwrap();
        sink.report(2, DiagnosticCode::FieldCount).unwrap();
        assert_eq!(sink.lines(), vec!["4: E0201", "2: E0101"]);
    }

    #[test]
    fn file_sink_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parse_errors.log");
        {
            let mut sink = open_sink(SinkKind::File, &path).unwrap();
            sink.report(7, DiagnosticCode::Unexpected).unwrap();
            sink.report(9, DiagnosticCode::FieldCount).unwrap();
            sink.flush().unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "7: E0000\n9: E0101\n");
    }

    #[test]
    fn sink_kind_parses() {
        assert_eq!("skip".parse::<SinkKind>(), Ok(SinkKind::Skip));
        assert_eq!("Console".parse::<SinkKind>(), Ok(SinkKind::Console));
        assert_eq!("file".parse::<SinkKind>(), Ok(SinkKind::File));
        assert!("syslog".parse::<SinkKind>().is_err());
    }
}
