//! Metadata-only directory scanner
//!
//! Lists directories and reads `lstat` metadata. File contents are never
//! opened.

use crate::config::ConfigError;
use crate::domain::{extension_of, FileRecord, ProjectSnapshot, DEFAULT_EXCLUDE_GLOBS};
use crate::utils::normalize_path;
use chrono::Utc;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, UNIX_EPOCH};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("scan of {root} timed out after {elapsed:?} ({entries} entries seen)")]
    TimedOut { root: PathBuf, elapsed: Duration, entries: usize },

    #[error("scan of {root} exceeded the limit of {limit} entries")]
    TooManyEntries { root: PathBuf, limit: usize },

    #[error("failed to read scan root {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Timeouts and entry caps leave the root's baseline untouched for this cycle.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, ScanError::TimedOut { .. } | ScanError::TooManyEntries { .. })
    }
}

/// Per-root scan counters, surfaced in cycle diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub files: usize,
    pub dirs: usize,
    pub excluded: usize,
    pub symlinks_skipped: usize,
    /// Entries that could not be read (permissions, races, loops).
    pub errors_skipped: usize,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub snapshot: ProjectSnapshot,
    pub stats: ScanStats,
    pub elapsed: Duration,
}

/// Translate user-facing exclude patterns into globs.
///
/// `name/` excludes a directory name at any depth. Patterns ending in `/**`
/// also match the directory itself so the walk can prune it.
fn expand_pattern(pattern: &str) -> Vec<String> {
    let pattern = match pattern.strip_suffix('/') {
        Some(dir) => format!("**/{}/**", dir.trim_start_matches("**/")),
        None => pattern.to_string(),
    };
    match pattern.strip_suffix("/**") {
        Some(dir) if !dir.is_empty() => vec![dir.to_string(), pattern.clone()],
        _ => vec![pattern],
    }
}

/// Default excludes plus `user_globs`, compiled into one matcher.
pub fn build_exclude_globset(user_globs: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    let defaults = DEFAULT_EXCLUDE_GLOBS.iter().map(|s| s.to_string());
    for pattern in defaults.chain(user_globs.iter().cloned()) {
        for expanded in expand_pattern(&pattern) {
            let glob = Glob::new(&expanded)
                .map_err(|source| ConfigError::InvalidGlob { pattern: pattern.clone(), source })?;
            builder.add(glob);
        }
    }
    builder.build().map_err(|source| ConfigError::InvalidGlob { pattern: user_globs.join(", "), source })
}

/// Scanner producing a [`ProjectSnapshot`] for one scan root.
pub struct MetadataScanner {
    root_path: PathBuf,
    exclude_globs: Vec<String>,
    max_depth: Option<usize>,
    timeout: Option<Duration>,
    max_entries: Option<usize>,
    stats: ScanStats,
}

impl MetadataScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            exclude_globs: Vec::new(),
            max_depth: None,
            timeout: None,
            max_entries: None,
            stats: ScanStats::default(),
        }
    }

    /// Set glob patterns to exclude (in addition to the defaults)
    pub fn exclude_globs(mut self, globs: Vec<String>) -> Self {
        self.exclude_globs = globs;
        self
    }

    /// Limit recursion depth below the root
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Give up on the root once this much wall time has passed
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Give up on the root after visiting this many entries
    pub fn max_entries(mut self, limit: usize) -> Self {
        self.max_entries = Some(limit);
        self
    }

    fn check_root(&self) -> Result<(), ScanError> {
        match std::fs::metadata(&self.root_path) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(ConfigError::NotADirectory(self.root_path.clone()).into()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ConfigError::MissingRoot(self.root_path.clone()).into())
            }
            Err(source) => Err(ScanError::Io { path: self.root_path.clone(), source }),
        }
    }

    /// Walk the root and record metadata for every non-excluded entry.
    pub fn scan(&mut self) -> Result<ScanOutcome, ScanError> {
        self.stats = ScanStats::default();
        self.check_root()?;

        let excludes = build_exclude_globset(&self.exclude_globs)?;
        let started = Instant::now();
        let mut snapshot = ProjectSnapshot::new(Utc::now());
        let mut visited = 0usize;
        let mut excluded = 0usize;

        let mut walker = WalkDir::new(&self.root_path).follow_links(false).min_depth(1);
        if let Some(depth) = self.max_depth {
            // walkdir depth 1 is a direct child of the root
            walker = walker.max_depth(depth + 1);
        }

        let root = self.root_path.clone();
        let iter = walker.into_iter().filter_entry(|entry| {
            let keep = match relative_path(&root, entry.path()) {
                Some(rel) => !excludes.is_match(&rel),
                None => true,
            };
            if !keep {
                excluded += 1;
            }
            keep
        });

        for entry_result in iter {
            visited += 1;
            if let Some(timeout) = self.timeout {
                let elapsed = started.elapsed();
                if elapsed > timeout {
                    return Err(ScanError::TimedOut { root: self.root_path.clone(), elapsed, entries: visited });
                }
            }
            if let Some(limit) = self.max_entries {
                if visited > limit {
                    return Err(ScanError::TooManyEntries { root: self.root_path.clone(), limit });
                }
            }

            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    if err.depth() == 0 {
                        let source = err.into_io_error().unwrap_or_else(|| {
                            std::io::Error::other("unreadable scan root")
                        });
                        return Err(ScanError::Io { path: self.root_path.clone(), source });
                    }
                    tracing::debug!(error = %err, "Skipping unreadable entry during scan");
                    self.stats.errors_skipped += 1;
                    continue;
                }
            };

            if entry.path_is_symlink() {
                self.stats.symlinks_skipped += 1;
                continue;
            }

            let Some(rel_path) = relative_path(&self.root_path, entry.path()) else {
                self.stats.errors_skipped += 1;
                continue;
            };

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    tracing::debug!(error = %err, "Skipping entry without metadata");
                    self.stats.errors_skipped += 1;
                    continue;
                }
            };

            let mtime_ns = modified_nanos(&metadata);
            if metadata.is_dir() {
                self.stats.dirs += 1;
                snapshot.insert(FileRecord::dir(rel_path, mtime_ns));
            } else {
                self.stats.files += 1;
                let ext = extension_of(&rel_path);
                snapshot.insert(FileRecord { rel_path, is_dir: false, size_bytes: metadata.len(), mtime_ns, ext });
            }
        }

        self.stats.excluded = excluded;
        Ok(ScanOutcome { snapshot, stats: self.stats.clone(), elapsed: started.elapsed() })
    }

    /// Get scanning statistics of the last run
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let rel = normalize_path(&rel.to_string_lossy());
    if rel.is_empty() {
        None
    } else {
        Some(rel)
    }
}

fn modified_nanos(metadata: &Metadata) -> i64 {
    let Ok(modified) = metadata.modified() else {
        return 0;
    };
    match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_nanos().min(i64::MAX as u128) as i64,
        Err(before) => -(before.duration().as_nanos().min(i64::MAX as u128) as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scan(root: &Path) -> ScanOutcome {
        MetadataScanner::new(root.to_path_buf()).scan().expect("scan")
    }

    #[test]
    fn records_files_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.py"), "print('hi')\n").unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub/b.TS"), "const x = 1;\n").unwrap();

        let outcome = scan(root);
        let entries = &outcome.snapshot.entries;

        assert_eq!(entries["a.py"].ext, "py");
        assert_eq!(entries["a.py"].size_bytes, 12);
        assert!(entries["sub"].is_dir);
        assert_eq!(entries["sub"].size_bytes, 0);
        assert_eq!(entries["sub/b.TS"].ext, "ts");
        assert_eq!(outcome.stats.files, 2);
        assert_eq!(outcome.stats.dirs, 1);
    }

    #[test]
    fn default_excludes_prune_vcs_and_dependency_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for noise in [".git", "node_modules", "__pycache__", ".venv", "build"] {
            fs::create_dir_all(root.join(noise).join("deep")).unwrap();
            fs::write(root.join(noise).join("deep/file.py"), "# noise").unwrap();
        }
        fs::write(root.join("x.py"), "print(1)\n").unwrap();

        let outcome = scan(root);
        let paths: Vec<&str> = outcome.snapshot.entries.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["x.py"], "unexpected entries: {paths:?}");
        assert_eq!(outcome.stats.excluded, 5);
    }

    #[test]
    fn user_globs_and_directory_patterns_apply() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("crates/core/target/debug")).unwrap();
        fs::write(root.join("crates/core/target/debug/app"), "bin").unwrap();
        fs::write(root.join("crates/core/lib.rs"), "fn f() {}").unwrap();
        fs::write(root.join("run.log"), "log").unwrap();

        let outcome = MetadataScanner::new(root.to_path_buf())
            .exclude_globs(vec!["target/".to_string(), "**/*.log".to_string()])
            .scan()
            .expect("scan");
        let entries = &outcome.snapshot.entries;

        assert!(entries.contains_key("crates/core/lib.rs"));
        assert!(!entries.keys().any(|k| k.contains("target")));
        assert!(!entries.contains_key("run.log"));
    }

    #[test]
    fn max_depth_limits_recursion() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/one.rs"), "1").unwrap();
        fs::write(root.join("a/b/two.rs"), "2").unwrap();

        let outcome = MetadataScanner::new(root.to_path_buf()).max_depth(Some(1)).scan().expect("scan");
        assert!(outcome.snapshot.entries.contains_key("a/one.rs"));
        assert!(!outcome.snapshot.entries.contains_key("a/b/two.rs"));
    }

    #[test]
    fn missing_root_is_a_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone");
        let err = MetadataScanner::new(missing).scan().unwrap_err();
        assert!(matches!(err, ScanError::Config(ConfigError::MissingRoot(_))));
        assert!(!err.is_incomplete());
    }

    #[test]
    fn file_root_is_a_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        let err = MetadataScanner::new(file).scan().unwrap_err();
        assert!(matches!(err, ScanError::Config(ConfigError::NotADirectory(_))));
    }

    #[test]
    fn entry_cap_reports_incomplete_scan() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for i in 0..10 {
            fs::write(root.join(format!("f{i}.rs")), "x").unwrap();
        }
        let err = MetadataScanner::new(root.to_path_buf()).max_entries(3).scan().unwrap_err();
        assert!(matches!(err, ScanError::TooManyEntries { limit: 3, .. }));
        assert!(err.is_incomplete());
    }

    #[test]
    fn zero_timeout_reports_incomplete_scan() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.rs"), "x").unwrap();
        let err = MetadataScanner::new(root.to_path_buf())
            .timeout(Duration::from_nanos(1))
            .scan()
            .unwrap_err();
        assert!(matches!(err, ScanError::TimedOut { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loops_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("dir")).unwrap();
        fs::write(root.join("dir/a.rs"), "x").unwrap();
        std::os::unix::fs::symlink(root.join("dir"), root.join("dir/loop")).unwrap();

        let outcome = scan(root);
        assert!(outcome.snapshot.entries.contains_key("dir/a.rs"));
        assert!(!outcome.snapshot.entries.contains_key("dir/loop"));
        assert_eq!(outcome.stats.symlinks_skipped, 1);
    }

    #[test]
    fn pattern_expansion() {
        assert_eq!(expand_pattern("target/"), vec!["**/target".to_string(), "**/target/**".to_string()]);
        assert_eq!(expand_pattern("**/*.log"), vec!["**/*.log".to_string()]);
    }
}
