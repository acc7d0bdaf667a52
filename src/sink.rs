//! Record sink — append-only persistence for completed answer sets.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::SinkError;

/// Durable append-only store for completed records.
///
/// Each call appends exactly one self-contained record; concurrent appends
/// for different users must never interleave fields.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn append(&self, record: &[String]) -> Result<(), SinkError>;
}

/// CSV-backed sink. One quoted line per record, file opened for append on
/// every call and never truncated.
pub struct CsvSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl RecordSink for CsvSink {
    async fn append(&self, record: &[String]) -> Result<(), SinkError> {
        let line = csv_line(record);

        // The full line is written under the lock in one call, so records
        // from concurrent completions land as whole lines.
        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| SinkError::Open(format!("{}: {e}", self.path.display())))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| SinkError::Append(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| SinkError::Append(e.to_string()))?;

        Ok(())
    }
}

/// In-memory sink for tests and dry runs.
pub struct MemorySink {
    records: Mutex<Vec<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    pub async fn records(&self) -> Vec<Vec<String>> {
        self.records.lock().await.clone()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn append(&self, record: &[String]) -> Result<(), SinkError> {
        self.records.lock().await.push(record.to_vec());
        Ok(())
    }
}

/// Render one record as an RFC 4180 CSV line, including the trailing
/// newline. Fields containing a comma, quote, or line break are quoted
/// with embedded quotes doubled.
fn csv_line(fields: &[String]) -> String {
    let mut line = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        if field.contains([',', '"', '\n', '\r']) {
            line.push('"');
            line.push_str(&field.replace('"', "\"\""));
            line.push('"');
        } else {
            line.push_str(field);
        }
    }
    line.push('\n');
    line
}
