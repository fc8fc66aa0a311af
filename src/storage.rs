// colloquy/src/storage.rs

//! Append-only JSONL run log.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

/// Writes one JSON object per line to a log file. The parent directory is
/// created at construction so a missing log path fails at wiring time, not
/// in the middle of a run.
pub struct JsonlRunLogger {
    path: PathBuf,
}

impl JsonlRunLogger {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory: {}", parent.display())
                })?;
            }
        }
        debug!(path = %path.display(), "Run log opened");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record, stamped with the current time. Each call opens
    /// and closes the file, so interleaved writers never corrupt a line of
    /// their own.
    pub fn append<T: Serialize>(&self, record: &T) -> Result<()> {
        let line = json!({
            "timestamp": now_rfc3339(),
            "record": record,
        });
        self.append_line(&line)
    }

    fn append_line(&self, value: &Value) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open log file: {}", self.path.display()))?;
        writeln!(file, "{}", value)
            .with_context(|| format!("Failed to write log file: {}", self.path.display()))?;
        Ok(())
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
