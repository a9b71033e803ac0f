//! Trace exporters

use crate::TraceError;
use ragline_domain::TraceRecord;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Final destination for records drained by the worker
pub trait TraceExporter: Send {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Export one record
    fn export(&mut self, record: &TraceRecord) -> Result<(), TraceError>;

    /// Push buffered output to its destination
    fn flush(&mut self) -> Result<(), TraceError> {
        Ok(())
    }
}

/// Writes each record as a structured `tracing` event
#[derive(Debug, Default)]
pub struct LogExporter;

impl TraceExporter for LogExporter {
    fn name(&self) -> &str {
        "log"
    }

    fn export(&mut self, record: &TraceRecord) -> Result<(), TraceError> {
        let attributes = serde_json::to_string(&record.attributes)?;
        tracing::info!(
            target: "ragline::trace",
            query_id = %record.query_id,
            stage = %record.stage,
            duration_ms = record.duration_ms(),
            attributes = %attributes,
            "stage"
        );
        Ok(())
    }
}

/// Appends records to a file, one JSON object per line
pub struct JsonlExporter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlExporter {
    /// Open `path` for appending, creating it and its parent directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Target file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TraceExporter for JsonlExporter {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn export(&mut self, record: &TraceRecord) -> Result<(), TraceError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TraceError> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for JsonlExporter {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to flush trace file");
        }
    }
}
