//! Snapshot diffing
//!
//! Entries are matched by relative path only. Content is never compared: an
//! entry whose size or mtime changed counts as modified.

use crate::domain::{FileRecord, ProjectSnapshot};
use crate::estimate::is_known_extension;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the current snapshot is compared against.
#[derive(Debug, Clone, Copy)]
pub enum Previous<'a> {
    /// The project has never been observed. The resulting delta establishes
    /// the baseline and contributes no bytes or LOC to reports.
    FirstSight,
    Known(&'a ProjectSnapshot),
}

impl<'a> From<Option<&'a ProjectSnapshot>> for Previous<'a> {
    fn from(previous: Option<&'a ProjectSnapshot>) -> Self {
        match previous {
            Some(snapshot) => Previous::Known(snapshot),
            None => Previous::FirstSight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOrigin {
    Discovery,
    Observed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCounts {
    pub files_added: u64,
    pub files_removed: u64,
    pub files_modified: u64,
    pub folders_added: u64,
    pub folders_removed: u64,
    pub folders_modified: u64,
    /// Files whose extension maps to no known language.
    pub assets_added: u64,
    pub assets_modified: u64,
    pub assets_removed: u64,
}

impl ChangeCounts {
    pub fn merge(&mut self, other: &ChangeCounts) {
        self.files_added += other.files_added;
        self.files_removed += other.files_removed;
        self.files_modified += other.files_modified;
        self.folders_added += other.folders_added;
        self.folders_removed += other.folders_removed;
        self.folders_modified += other.folders_modified;
        self.assets_added += other.assets_added;
        self.assets_modified += other.assets_modified;
        self.assets_removed += other.assets_removed;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub before: FileRecord,
    pub after: FileRecord,
}

/// Structural and byte-level change of one project between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub origin: DeltaOrigin,
    pub added: Vec<FileRecord>,
    pub removed: Vec<FileRecord>,
    pub modified: Vec<FileChange>,
    pub counts: ChangeCounts,
    /// Signed byte delta per lower-cased extension (`""` for none).
    pub byte_delta_by_ext: BTreeMap<String, i64>,
}

impl Delta {
    fn new(origin: DeltaOrigin) -> Self {
        Self {
            origin,
            added: Vec::new(),
            removed: Vec::new(),
            modified: Vec::new(),
            counts: ChangeCounts::default(),
            byte_delta_by_ext: BTreeMap::new(),
        }
    }

    pub fn is_discovery(&self) -> bool {
        self.origin == DeltaOrigin::Discovery
    }

    /// No entry was added, removed or modified.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Worth reporting: a file changed or a folder appeared or vanished.
    /// Folder mtime churn alone is not activity.
    pub fn has_activity(&self) -> bool {
        let c = &self.counts;
        c.files_added + c.files_removed + c.files_modified + c.folders_added + c.folders_removed > 0
    }

    pub fn total_byte_delta(&self) -> i64 {
        self.byte_delta_by_ext.values().sum()
    }

    fn add_bytes(&mut self, ext: &str, delta: i64) {
        *self.byte_delta_by_ext.entry(ext.to_string()).or_insert(0) += delta;
    }

    fn record_added(&mut self, record: &FileRecord) {
        if record.is_dir {
            self.counts.folders_added += 1;
        } else {
            self.counts.files_added += 1;
            if !is_known_extension(&record.ext) {
                self.counts.assets_added += 1;
            }
            self.add_bytes(&record.ext, size_as_i64(record.size_bytes));
        }
        self.added.push(record.clone());
    }

    fn record_removed(&mut self, record: &FileRecord) {
        if record.is_dir {
            self.counts.folders_removed += 1;
        } else {
            self.counts.files_removed += 1;
            if !is_known_extension(&record.ext) {
                self.counts.assets_removed += 1;
            }
            self.add_bytes(&record.ext, -size_as_i64(record.size_bytes));
        }
        self.removed.push(record.clone());
    }

    fn record_modified(&mut self, before: &FileRecord, after: &FileRecord) {
        if after.is_dir {
            self.counts.folders_modified += 1;
        } else {
            self.counts.files_modified += 1;
            if !is_known_extension(&after.ext) {
                self.counts.assets_modified += 1;
            }
            if before.ext == after.ext {
                self.add_bytes(&after.ext, size_as_i64(after.size_bytes) - size_as_i64(before.size_bytes));
            } else {
                self.add_bytes(&before.ext, -size_as_i64(before.size_bytes));
                self.add_bytes(&after.ext, size_as_i64(after.size_bytes));
            }
        }
        self.modified.push(FileChange { before: before.clone(), after: after.clone() });
    }
}

fn size_as_i64(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

/// Compare `current` against `previous`.
pub fn diff(previous: Previous<'_>, current: &ProjectSnapshot) -> Delta {
    let previous = match previous {
        Previous::FirstSight => {
            let mut delta = Delta::new(DeltaOrigin::Discovery);
            for record in current.entries.values() {
                delta.record_added(record);
            }
            return delta;
        }
        Previous::Known(snapshot) => snapshot,
    };

    let mut delta = Delta::new(DeltaOrigin::Observed);

    for (path, record) in &current.entries {
        match previous.entries.get(path) {
            None => delta.record_added(record),
            Some(old) if old.is_dir != record.is_dir => {
                // Kind flip: the old entry is gone and a new one took its place.
                delta.record_removed(old);
                delta.record_added(record);
            }
            Some(old) if old.size_bytes != record.size_bytes || old.mtime_ns != record.mtime_ns => {
                delta.record_modified(old, record);
            }
            Some(_) => {}
        }
    }

    for (path, old) in &previous.entries {
        if !current.entries.contains_key(path) {
            delta.record_removed(old);
        }
    }

    delta
}
