//! JSON-lines file destination.

use async_trait::async_trait;
use reqlog_core::{Record, Sink, SinkError, SinkResult};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Sink appending each record as one JSON object per line.
///
/// The file is created if needed and always appended to, so the output can
/// be tailed or shipped by a log collector.
///
/// ```ignore
/// use reqlog_sinks::FileSink;
///
/// let sink = FileSink::new("./requests.jsonl")?;
/// ```
pub struct FileSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    /// Open (or create) `path` for appending.
    pub fn new(path: impl Into<PathBuf>) -> SinkResult<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// The file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for FileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSink").field("path", &self.path).finish()
    }
}

#[async_trait]
impl Sink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn deliver(&self, record: &Record) -> SinkResult<()> {
        let json = record.to_json_line()?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;

        writeln!(writer, "{}", json)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqlog_core::RecordBuilder;

    #[tokio::test]
    async fn test_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.jsonl");

        let sink = FileSink::new(&path).unwrap();
        sink.deliver(&RecordBuilder::new("GET", "/a").build()).await.unwrap();
        drop(sink);

        // Reopening appends instead of truncating.
        let sink = FileSink::new(&path).unwrap();
        sink.deliver(&RecordBuilder::new("DELETE", "/b").status(204).build())
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let records: Vec<Record> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, "/a");
        assert_eq!(records[1].method, "DELETE");
        assert_eq!(records[1].status, 204);
    }

    #[test]
    fn test_unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileSink::new(dir.path().join("missing").join("out.jsonl"));
        assert!(matches!(result, Err(SinkError::Io(_))));
    }
}
