//! Diagnostic sinks for raw test targets.
//!
//! Schema-aware orchestrators can dump the raw (unshifted) test targets of
//! every inference batch for offline inspection. A record is one line per
//! batch element:
//!
//! ```text
//! test_target\t1\t2\t0
//! test_target\t3\t3\t1
//! ```
//!
//! Sinks are append-only and never read back by fewtag. Both implementations
//! serialise writers internally, so one sink can be shared by concurrent
//! forward calls.

use crate::sync::{lock, Mutex};
use crate::Result;
use ndarray::ArrayView2;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Append-only sink for newline-terminated UTF-8 records.
pub trait TargetSink: Send + Sync {
    /// Append a record. `record` already ends with `\n`.
    fn append(&self, record: &str) -> Result<()>;
}

/// Format raw targets as `test_target\t<id>\t<id>...` lines.
///
/// Every line, including the last, ends with `\n`.
#[must_use]
pub fn target_record(test_target: ArrayView2<'_, usize>) -> String {
    let mut out = String::new();
    for row in test_target.rows() {
        out.push_str("test_target");
        for id in row {
            out.push('\t');
            out.push_str(&id.to_string());
        }
        out.push('\n');
    }
    out
}

/// Sink appending to a file.
///
/// The file is opened in append mode and created if missing; every record is
/// flushed before `append` returns.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    /// Open (or create) `path` for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        log::debug!("[fewtag] logging test targets to {}", path.display());
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// File being appended to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TargetSink for FileSink {
    fn append(&self, record: &str) -> Result<()> {
        let mut writer = lock(&self.writer);
        writer.write_all(record.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

/// In-memory sink, mostly useful in tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<String>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records appended so far.
    #[must_use]
    pub fn records(&self) -> Vec<String> {
        lock(&self.records).clone()
    }

    /// Concatenation of every record.
    #[must_use]
    pub fn contents(&self) -> String {
        lock(&self.records).concat()
    }
}

impl TargetSink for MemorySink {
    fn append(&self, record: &str) -> Result<()> {
        lock(&self.records).push(record.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_target_record_format() {
        let target = array![[1usize, 2, 0], [3, 0, 0]];
        assert_eq!(
            target_record(target.view()),
            "test_target\t1\t2\t0\ntest_target\t3\t0\t0\n"
        );
    }

    #[test]
    fn test_memory_sink_appends() {
        let sink = MemorySink::new();
        sink.append("a\n").unwrap();
        sink.append("b\n").unwrap();
        assert_eq!(sink.records().len(), 2);
        assert_eq!(sink.contents(), "a\nb\n");
    }

    #[test]
    fn test_file_sink_appends_across_opens() {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let path = dir.path().join("emb.log");

        FileSink::open(&path).unwrap().append("first\n").unwrap();
        let sink = FileSink::open(&path).unwrap();
        sink.append("second\n").unwrap();
        assert_eq!(sink.path(), path.as_path());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }
}
