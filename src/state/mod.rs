//! Baseline store: the previous cycle's snapshots, kept outside the published repo.

pub mod lock;

pub use lock::ProcessLock;

use crate::domain::{ProjectIdentity, ProjectSnapshot};
use crate::utils::atomic_write_json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Bump when the on-disk layout changes incompatibly. Older or newer files are
/// discarded and the next cycle re-establishes the baseline.
pub const STATE_FORMAT_VERSION: u32 = 2;

pub type Baseline = BTreeMap<ProjectIdentity, ProjectSnapshot>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read baseline {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write baseline {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    format_version: u32,
    saved_at: DateTime<Utc>,
    projects: Baseline,
}

#[derive(Debug, Deserialize)]
struct VersionHeader {
    format_version: Option<u32>,
}

pub struct BaselineStore {
    path: PathBuf,
}

impl BaselineStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored baseline. An absent, unreadable-as-JSON, or
    /// incompatible file yields an empty baseline (every project is then seen
    /// for the first time).
    pub fn load(&self) -> Result<Baseline, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No baseline yet; this cycle establishes it");
                return Ok(Baseline::new());
            }
            Err(source) => return Err(StoreError::Read { path: self.path.clone(), source }),
        };

        match serde_json::from_str::<VersionHeader>(&content) {
            Ok(VersionHeader { format_version: Some(STATE_FORMAT_VERSION) }) => {}
            Ok(header) => {
                tracing::warn!(
                    path = %self.path.display(),
                    found = ?header.format_version,
                    expected = STATE_FORMAT_VERSION,
                    "Incompatible baseline format; starting a fresh baseline"
                );
                return Ok(Baseline::new());
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "Unreadable baseline; starting a fresh baseline");
                return Ok(Baseline::new());
            }
        }

        match serde_json::from_str::<StateFile>(&content) {
            Ok(state) => Ok(state.projects),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "Malformed baseline; starting a fresh baseline");
                Ok(Baseline::new())
            }
        }
    }

    /// Replace the stored baseline (write-to-temp, then rename).
    pub fn save(&self, baseline: &Baseline) -> Result<(), StoreError> {
        let state = StateFile { format_version: STATE_FORMAT_VERSION, saved_at: Utc::now(), projects: baseline.clone() };
        atomic_write_json(&self.path, &state).map_err(|source| StoreError::Write { path: self.path.clone(), source })?;
        tracing::debug!(path = %self.path.display(), projects = baseline.len(), "Saved baseline");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FileRecord;
    use crate::privacy::{PseudonymKey, Pseudonymizer};
    use std::fs;
    use tempfile::TempDir;

    fn identity(path: &str) -> ProjectIdentity {
        Pseudonymizer::new(PseudonymKey::from_bytes([7u8; 32])).identify(Path::new(path))
    }

    #[test]
    fn missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = BaselineStore::open(tmp.path().join("state.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_preserves_snapshots() {
        let tmp = TempDir::new().unwrap();
        let store = BaselineStore::open(tmp.path().join("state").join("state.json"));

        let mut baseline = Baseline::new();
        baseline.insert(
            identity("/work/app"),
            ProjectSnapshot::from_records(Utc::now(), vec![FileRecord::file("src/main.rs", 120, 42)]),
        );
        store.save(&baseline).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, baseline);
    }

    #[test]
    fn incompatible_version_starts_fresh() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        fs::write(&path, r#"{"format_version": 99, "projects": {"x": 1}}"#).unwrap();
        assert!(BaselineStore::open(&path).load().unwrap().is_empty());

        fs::write(&path, r#"{"schema_version": 1, "root": "/x", "entries": {}}"#).unwrap();
        assert!(BaselineStore::open(&path).load().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_starts_fresh() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(BaselineStore::open(&path).load().unwrap().is_empty());
    }
}
