//! Artifact persistence: JSON reports, the redirect map and human summaries.
//!
//! Every artifact is written to a temporary file in its destination directory and
//! renamed into place, so a failed or interrupted run never leaves a partial file.

mod checkpoint;
mod markdown;

pub use checkpoint::Checkpoint;
pub use markdown::{render_diff_summary, render_fix_summary, DEFAULT_PREVIEW_LIMIT};

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::models::RedirectMapping;

pub const DIFF_REPORT_JSON: &str = "diff-report.json";
pub const DIFF_REPORT_MD: &str = "diff-report.md";
pub const FIX_REPORT_JSON: &str = "fix-report.json";
pub const FIX_REPORT_MD: &str = "fix-report.md";
pub const REDIRECT_MAP_JSON: &str = "redirect-map.json";
pub const EXTRACTED_CONTENT_JSON: &str = "extracted-content.json";
pub const EXTRACTION_CHECKPOINT: &str = ".extraction-checkpoint.jsonl";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed artifact {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ReportError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Locations of every artifact inside one output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn diff_json(&self) -> PathBuf {
        self.dir.join(DIFF_REPORT_JSON)
    }

    pub fn diff_markdown(&self) -> PathBuf {
        self.dir.join(DIFF_REPORT_MD)
    }

    pub fn fix_json(&self) -> PathBuf {
        self.dir.join(FIX_REPORT_JSON)
    }

    pub fn fix_markdown(&self) -> PathBuf {
        self.dir.join(FIX_REPORT_MD)
    }

    pub fn redirect_map(&self) -> PathBuf {
        self.dir.join(REDIRECT_MAP_JSON)
    }

    pub fn extracted_content(&self) -> PathBuf {
        self.dir.join(EXTRACTED_CONTENT_JSON)
    }

    pub fn checkpoint(&self) -> PathBuf {
        self.dir.join(EXTRACTION_CHECKPOINT)
    }

    pub fn ensure_dir(&self) -> Result<(), ReportError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| ReportError::io(&self.dir, e))
    }
}

/// Hex SHA-256 of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Pretty JSON with a trailing newline, the on-disk form of every JSON artifact.
pub fn to_json_bytes<T: Serialize>(value: &T, path: &Path) -> Result<Vec<u8>, ReportError> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|source| ReportError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Write `contents` to `path` via a temporary sibling and an atomic rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ReportError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| ReportError::io(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ReportError::io(dir, e))?;
    tmp.write_all(contents)
        .map_err(|e| ReportError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| ReportError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| ReportError::io(path, e.error))?;

    debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

/// Serialize `value` and write it atomically. Returns the SHA-256 of the written bytes.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<String, ReportError> {
    let bytes = to_json_bytes(value, path)?;
    write_atomic(path, &bytes)?;
    Ok(sha256_hex(&bytes))
}

/// Read raw bytes of an artifact.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>, ReportError> {
    std::fs::read(path).map_err(|e| ReportError::io(path, e))
}

pub fn parse_json<T: DeserializeOwned>(bytes: &[u8], path: &Path) -> Result<T, ReportError> {
    serde_json::from_slice(bytes).map_err(|source| ReportError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and parse a JSON artifact, or `None` when the file does not exist.
pub fn read_json_if_exists<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ReportError> {
    match std::fs::read(path) {
        Ok(bytes) => parse_json(&bytes, path).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ReportError::io(path, e)),
    }
}

/// Outcome of merging new redirect rules into an existing map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectMerge {
    pub mappings: Vec<RedirectMapping>,
    pub added: usize,
    /// Rules whose `from` was already mapped; the existing rule wins.
    pub kept_existing: usize,
}

/// Append `new` rules to `existing`, never replacing a `from` that is already mapped.
///
/// Appended rules are sorted by `from` so reruns produce the same file.
pub fn merge_redirects(existing: Vec<RedirectMapping>, new: Vec<RedirectMapping>) -> RedirectMerge {
    let mut seen: HashSet<String> = existing.iter().map(|m| m.from.clone()).collect();
    let mut appended: Vec<RedirectMapping> = Vec::new();
    let mut kept_existing = 0;

    for mapping in new {
        if seen.insert(mapping.from.clone()) {
            appended.push(mapping);
        } else {
            kept_existing += 1;
        }
    }
    appended.sort_by(|a, b| a.from.cmp(&b.from));

    let added = appended.len();
    let mut mappings = existing;
    mappings.extend(appended);

    RedirectMerge {
        mappings,
        added,
        kept_existing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RedirectStatus;
    use tempfile::TempDir;

    fn mapping(from: &str, to: &str) -> RedirectMapping {
        RedirectMapping {
            from: from.to_string(),
            to: to.to_string(),
            status: RedirectStatus::Permanent,
            reason: "test".to_string(),
        }
    }

    #[test]
    fn test_write_json_is_pretty_with_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.json");
        let digest = write_json(&path, &vec![1, 2]).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.ends_with(b"]\n"));
        assert!(String::from_utf8_lossy(&bytes).contains("\n  1,"));
        assert_eq!(digest, sha256_hex(&bytes));
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_read_json_if_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json");
        let value: Option<Vec<u32>> = read_json_if_exists(&path).unwrap();
        assert!(value.is_none());

        std::fs::write(&path, "{not json").unwrap();
        let err = read_json_if_exists::<Vec<u32>>(&path).unwrap_err();
        assert!(matches!(err, ReportError::Malformed { .. }));
    }

    #[test]
    fn test_merge_is_append_only() {
        let existing = vec![mapping("/eski", "/yeni")];
        let merged = merge_redirects(
            existing,
            vec![
                mapping("/z", "/a"),
                mapping("/eski", "/baska"),
                mapping("/b", "/a"),
            ],
        );

        assert_eq!(merged.added, 2);
        assert_eq!(merged.kept_existing, 1);
        let froms: Vec<_> = merged.mappings.iter().map(|m| m.from.as_str()).collect();
        assert_eq!(froms, vec!["/eski", "/b", "/z"]);
        assert_eq!(merged.mappings[0].to, "/yeni");
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
