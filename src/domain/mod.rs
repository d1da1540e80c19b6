//! Core data model shared by the scan, diff and report stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Excludes applied to every scan root in addition to user globs.
pub const DEFAULT_EXCLUDE_GLOBS: &[&str] = &[
    "**/.git/**",
    "**/.hg/**",
    "**/.svn/**",
    "**/.idea/**",
    "**/.vscode/**",
    "**/__pycache__/**",
    "**/.venv/**",
    "**/venv/**",
    "**/node_modules/**",
    "**/dist/**",
    "**/build/**",
];

/// A configured directory the engine observes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRoot {
    pub path: PathBuf,
    pub exclude_globs: Vec<String>,
}

impl ScanRoot {
    pub fn new(path: impl Into<PathBuf>, exclude_globs: Vec<String>) -> Self {
        Self { path: path.into(), exclude_globs }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Metadata of a single filesystem entry below a scan root.
///
/// `rel_path` is only used for matching entries between snapshots. It is
/// persisted in the process-local baseline and never reaches a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub rel_path: String,
    pub is_dir: bool,
    pub size_bytes: u64,
    pub mtime_ns: i64,
    /// Lower-cased extension without the dot, empty for directories.
    #[serde(default)]
    pub ext: String,
}

impl FileRecord {
    pub fn file(rel_path: impl Into<String>, size_bytes: u64, mtime_ns: i64) -> Self {
        let rel_path = rel_path.into();
        let ext = extension_of(&rel_path);
        Self { rel_path, is_dir: false, size_bytes, mtime_ns, ext }
    }

    pub fn dir(rel_path: impl Into<String>, mtime_ns: i64) -> Self {
        Self { rel_path: rel_path.into(), is_dir: true, size_bytes: 0, mtime_ns, ext: String::new() }
    }
}

/// Lower-cased extension of the last path segment, without the leading dot.
///
/// Dotfiles such as `.gitignore` have no extension.
pub fn extension_of(rel_path: &str) -> String {
    let name = rel_path.rsplit('/').next().unwrap_or(rel_path);
    match name.rfind('.') {
        Some(0) | None => String::new(),
        Some(idx) => name[idx + 1..].to_ascii_lowercase(),
    }
}

/// Metadata-only inventory of one scan root at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub captured_at: DateTime<Utc>,
    /// Keyed by relative path, which canonicalizes iteration order.
    pub entries: BTreeMap<String, FileRecord>,
}

impl ProjectSnapshot {
    pub fn new(captured_at: DateTime<Utc>) -> Self {
        Self { captured_at, entries: BTreeMap::new() }
    }

    pub fn from_records(captured_at: DateTime<Utc>, records: impl IntoIterator<Item = FileRecord>) -> Self {
        let entries = records.into_iter().map(|r| (r.rel_path.clone(), r)).collect();
        Self { captured_at, entries }
    }

    pub fn insert(&mut self, record: FileRecord) {
        self.entries.insert(record.rel_path.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Stable pseudonymous label standing in for a scan root path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectIdentity(String);

impl ProjectIdentity {
    pub const PREFIX: &'static str = "Project-";

    pub(crate) fn from_digest_hex(hex: &str) -> Self {
        Self(format!("{}{}", Self::PREFIX, hex))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
