//! Destinations for evaluation results

use crate::EvalError;
use ragline_domain::{EvaluationResult, QueryId};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Stores finished evaluation results
pub trait EvaluationSink: Send {
    /// Persist one result
    fn record(&mut self, result: &EvaluationResult) -> Result<(), EvalError>;
}

/// Appends one flat JSON object per result to a file
pub struct JsonlEvaluationSink {
    path: PathBuf,
    file: File,
}

impl JsonlEvaluationSink {
    /// Open `path` for appending, creating it and its parent directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EvalError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// Target file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EvaluationSink for JsonlEvaluationSink {
    fn record(&mut self, result: &EvaluationResult) -> Result<(), EvalError> {
        let mut line = serde_json::to_vec(result)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.flush()?;
        Ok(())
    }
}

/// Keeps results in memory; clones share the buffer
#[derive(Debug, Clone, Default)]
pub struct MemoryEvaluationSink {
    results: Arc<Mutex<Vec<EvaluationResult>>>,
}

impl MemoryEvaluationSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Every result, oldest first
    pub fn results(&self) -> Vec<EvaluationResult> {
        self.lock().clone()
    }

    /// Result for one query, if scored
    pub fn get(&self, query_id: QueryId) -> Option<EvaluationResult> {
        self.lock().iter().find(|r| r.query_id == query_id).cloned()
    }

    /// Number of results held
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<EvaluationResult>> {
        self.results.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EvaluationSink for MemoryEvaluationSink {
    fn record(&mut self, result: &EvaluationResult) -> Result<(), EvalError> {
        self.lock().push(result.clone());
        Ok(())
    }
}
