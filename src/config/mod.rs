//! Agent configuration
//!
//! The configuration is loaded once per process (file, then environment) and
//! handed to the cycle as an immutable value. Nothing below the CLI reads
//! ambient settings.

pub mod loader;

pub use loader::{default_config_path, load_config};

use crate::scan::build_exclude_globset;
use crate::utils::default_state_dir;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_INTERVAL_HOURS: u32 = 2;
pub const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_ENTRIES_PER_ROOT: usize = 500_000;
pub const DEFAULT_SCAN_WORKERS: usize = 4;
pub const MAX_SCAN_WORKERS: usize = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to load config: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("could not determine the home directory (set HOME or configure state_dir)")]
    NoHomeDir,

    #[error("scan_paths must include at least one directory")]
    NoScanPaths,

    #[error("repo_path is required")]
    MissingRepoPath,

    #[error("interval_hours must be between 1 and 4, got {0}")]
    InvalidInterval(u32),

    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("bytes_per_loc for '{language}' must be positive")]
    InvalidCalibration { language: String },

    #[error("invalid exclude glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("scan root does not exist: {0}")]
    MissingRoot(PathBuf),

    #[error("scan root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("two scan roots map to the same project identity {identity}")]
    IdentityCollision { identity: String },
}

/// Validated agent settings for one cycle.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub scan_paths: Vec<PathBuf>,
    pub repo_path: PathBuf,
    pub interval_hours: u32,
    pub branch: String,
    pub remote: String,
    pub push: bool,
    pub exclude_globs: Vec<String>,
    /// Calibration overrides keyed by lower-cased language label.
    pub bytes_per_loc: BTreeMap<String, u32>,
    pub split_subdirectories: bool,
    pub max_depth: Option<usize>,
    pub scan_timeout: Duration,
    pub max_entries_per_root: usize,
    pub scan_workers: usize,
    pub state_dir: PathBuf,
}

impl AgentConfig {
    /// Settings with defaults for everything but the paths.
    pub fn new(scan_paths: Vec<PathBuf>, repo_path: PathBuf, state_dir: PathBuf) -> Self {
        Self {
            scan_paths,
            repo_path,
            interval_hours: DEFAULT_INTERVAL_HOURS,
            branch: DEFAULT_BRANCH.to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            push: true,
            exclude_globs: Vec::new(),
            bytes_per_loc: BTreeMap::new(),
            split_subdirectories: false,
            max_depth: None,
            scan_timeout: Duration::from_secs(DEFAULT_SCAN_TIMEOUT_SECS),
            max_entries_per_root: DEFAULT_MAX_ENTRIES_PER_ROOT,
            scan_workers: DEFAULT_SCAN_WORKERS,
            state_dir,
        }
    }

    /// Settings rooted at the default state directory (`~/.prolific`).
    pub fn with_default_state_dir(scan_paths: Vec<PathBuf>, repo_path: PathBuf) -> Result<Self, ConfigError> {
        let state_dir = default_state_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self::new(scan_paths, repo_path, state_dir))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_paths.is_empty() {
            return Err(ConfigError::NoScanPaths);
        }
        if self.repo_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRepoPath);
        }
        if !(1..=4).contains(&self.interval_hours) {
            return Err(ConfigError::InvalidInterval(self.interval_hours));
        }
        if self.branch.trim().is_empty() {
            return Err(ConfigError::EmptyField { field: "branch" });
        }
        if self.remote.trim().is_empty() {
            return Err(ConfigError::EmptyField { field: "remote" });
        }
        for (language, value) in &self.bytes_per_loc {
            if *value == 0 {
                return Err(ConfigError::InvalidCalibration { language: language.clone() });
            }
        }
        build_exclude_globset(&self.exclude_globs)?;
        Ok(())
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_dir.join("state.json")
    }

    pub fn key_path(&self) -> PathBuf {
        self.state_dir.join("salt.key")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.state_dir.join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AgentConfig {
        AgentConfig::new(vec![PathBuf::from("/src/app")], PathBuf::from("/src/activity"), PathBuf::from("/state"))
    }

    #[test]
    fn defaults_validate() {
        config().validate().expect("defaults should be valid");
    }

    #[test]
    fn rejects_interval_out_of_range() {
        let mut cfg = config();
        cfg.interval_hours = 6;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidInterval(6))));
    }

    #[test]
    fn rejects_zero_calibration() {
        let mut cfg = config();
        cfg.bytes_per_loc.insert("python".to_string(), 0);
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidCalibration { .. })));
    }

    #[test]
    fn rejects_invalid_glob() {
        let mut cfg = config();
        cfg.exclude_globs = vec!["src/[".to_string()];
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidGlob { .. })));
    }

    #[test]
    fn rejects_missing_scan_paths() {
        let mut cfg = config();
        cfg.scan_paths.clear();
        assert!(matches!(cfg.validate(), Err(ConfigError::NoScanPaths)));
    }
}
