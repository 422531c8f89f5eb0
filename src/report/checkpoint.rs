//! JSONL checkpoint of extracted content, so an interrupted fix run can resume.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use super::ReportError;
use crate::models::ExtractedContent;

/// Append-only log of successful extractions, one JSON object per line.
pub struct Checkpoint {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Checkpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load previously checkpointed content keyed by normalized URL.
    ///
    /// A torn trailing line from an interrupted write is skipped.
    pub fn load(&self) -> Result<HashMap<String, ExtractedContent>, ReportError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(ReportError::io(&self.path, e)),
        };

        let mut entries = HashMap::new();
        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ExtractedContent>(line) {
                Ok(content) => {
                    entries.insert(content.key.clone(), content);
                }
                Err(e) => warn!(
                    "Skipping unreadable checkpoint line {} in {}: {}",
                    line_no + 1,
                    self.path.display(),
                    e
                ),
            }
        }
        Ok(entries)
    }

    pub async fn append(&self, content: &ExtractedContent) -> Result<(), ReportError> {
        let mut line = serde_json::to_vec(content).map_err(|source| ReportError::Serialize {
            path: self.path.clone(),
            source,
        })?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| ReportError::io(&self.path, e))?;
        file.write_all(&line)
            .await
            .map_err(|e| ReportError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| ReportError::io(&self.path, e))?;
        Ok(())
    }

    /// Remove the checkpoint once its content has been written to the final artifact.
    pub fn clear(&self) -> Result<(), ReportError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ReportError::io(&self.path, e)),
        }
    }
}
