//! Metadata scanning of configured scan roots

use crate::config::AgentConfig;
use crate::domain::ScanRoot;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod pool;
pub mod scanner;

pub use pool::{scan_roots, RootScan};
pub use scanner::{build_exclude_globset, MetadataScanner, ScanError, ScanOutcome, ScanStats};

/// Limits applied to every root of one cycle.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub max_depth: Option<usize>,
    pub timeout: Duration,
    pub max_entries: usize,
}

impl ScanSettings {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            timeout: config.scan_timeout,
            max_entries: config.max_entries_per_root,
        }
    }
}

/// Expand the configured scan paths into the scan roots of this cycle.
///
/// With `split_subdirectories`, each immediate, non-hidden, non-excluded
/// subdirectory of a scan path is its own project. A scan path without such
/// subdirectories (or one that cannot be listed) stays a root itself so the
/// scanner reports it.
pub fn resolve_scan_roots(config: &AgentConfig) -> Vec<ScanRoot> {
    let mut roots: Vec<ScanRoot> = Vec::new();
    for scan_path in &config.scan_paths {
        let paths = if config.split_subdirectories {
            project_subdirectories(scan_path, &config.exclude_globs)
        } else {
            Vec::new()
        };
        let paths = if paths.is_empty() { vec![scan_path.clone()] } else { paths };

        for path in paths {
            if roots.iter().any(|r| r.path == path) {
                continue;
            }
            roots.push(ScanRoot::new(path, config.exclude_globs.clone()));
        }
    }
    roots
}

fn project_subdirectories(scan_path: &Path, exclude_globs: &[String]) -> Vec<PathBuf> {
    let Ok(excludes) = build_exclude_globset(exclude_globs) else {
        return Vec::new();
    };
    let Ok(entries) = std::fs::read_dir(scan_path) else {
        return Vec::new();
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            !name.starts_with('.') && !excludes.is_match(&name)
        })
        .map(|entry| entry.path())
        .collect();
    dirs.sort();
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(scan_paths: Vec<PathBuf>) -> AgentConfig {
        AgentConfig::new(scan_paths, PathBuf::from("/repo"), PathBuf::from("/state"))
    }

    #[test]
    fn scan_paths_are_roots_by_default() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("inner")).unwrap();
        let roots = resolve_scan_roots(&config(vec![tmp.path().to_path_buf()]));
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].path, tmp.path());
    }

    #[test]
    fn split_subdirectories_creates_one_root_per_project() {
        let tmp = TempDir::new().unwrap();
        for dir in ["beta", "alpha", ".hidden", "node_modules"] {
            fs::create_dir(tmp.path().join(dir)).unwrap();
        }
        fs::write(tmp.path().join("notes.txt"), "x").unwrap();

        let mut cfg = config(vec![tmp.path().to_path_buf()]);
        cfg.split_subdirectories = true;
        let roots = resolve_scan_roots(&cfg);

        let names: Vec<String> =
            roots.iter().map(|r| r.path.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn split_without_subdirectories_keeps_scan_path() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("main.rs"), "fn main() {}").unwrap();
        let mut cfg = config(vec![tmp.path().to_path_buf()]);
        cfg.split_subdirectories = true;
        let roots = resolve_scan_roots(&cfg);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].path, tmp.path());
    }
}
