//! Config file loading
//!
//! Layering, lowest to highest precedence: built-in defaults, the TOML file's
//! `[agent]` table, then `PROLIFIC_*` environment variables.

use super::{
    AgentConfig, ConfigError, DEFAULT_BRANCH, DEFAULT_INTERVAL_HOURS, DEFAULT_MAX_ENTRIES_PER_ROOT,
    DEFAULT_REMOTE, DEFAULT_SCAN_TIMEOUT_SECS, DEFAULT_SCAN_WORKERS, MAX_SCAN_WORKERS,
};
use crate::utils::{default_state_dir, expand_home};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_PROFILE: &str = "agent";
const ENV_PREFIX: &str = "PROLIFIC_";

/// On-disk shape of the `[agent]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RawAgentConfig {
    scan_paths: Option<Vec<PathBuf>>,
    /// Older configs carried a single watch folder.
    scan_path: Option<PathBuf>,
    repo_path: Option<PathBuf>,
    interval_hours: u32,
    branch: String,
    remote: String,
    push: bool,
    excludes: RawExcludes,
    bytes_per_loc: BTreeMap<String, u32>,
    split_subdirectories: bool,
    max_depth: Option<usize>,
    scan_timeout_secs: u64,
    max_entries_per_root: usize,
    scan_workers: usize,
    state_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawExcludes {
    globs: Vec<String>,
}

impl Default for RawAgentConfig {
    fn default() -> Self {
        Self {
            scan_paths: None,
            scan_path: None,
            repo_path: None,
            interval_hours: DEFAULT_INTERVAL_HOURS,
            branch: DEFAULT_BRANCH.to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            push: true,
            excludes: RawExcludes::default(),
            bytes_per_loc: BTreeMap::new(),
            split_subdirectories: false,
            max_depth: None,
            scan_timeout_secs: DEFAULT_SCAN_TIMEOUT_SECS,
            max_entries_per_root: DEFAULT_MAX_ENTRIES_PER_ROOT,
            scan_workers: DEFAULT_SCAN_WORKERS,
            state_dir: None,
        }
    }
}

/// `~/.prolific/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    default_state_dir().map(|dir| dir.join("config.toml"))
}

/// Load and validate the agent configuration from `config_path`.
pub fn load_config(config_path: &Path) -> Result<AgentConfig, ConfigError> {
    if !config_path.is_file() {
        return Err(ConfigError::NotFound(config_path.to_path_buf()));
    }

    let raw: RawAgentConfig = Figment::from(Serialized::defaults(RawAgentConfig::default()))
        .merge(Toml::file(config_path).nested())
        .merge(Env::prefixed(ENV_PREFIX).split("__").global())
        .select(CONFIG_PROFILE)
        .extract()
        .map_err(|e| ConfigError::Load(Box::new(e)))?;

    let config = into_agent_config(raw)?;
    config.validate()?;
    tracing::debug!(
        path = %config_path.display(),
        scan_paths = config.scan_paths.len(),
        push = config.push,
        "Loaded agent config"
    );
    Ok(config)
}

fn into_agent_config(raw: RawAgentConfig) -> Result<AgentConfig, ConfigError> {
    let scan_paths_raw = match (raw.scan_paths, raw.scan_path) {
        (Some(paths), _) => paths,
        (None, Some(single)) => vec![single],
        (None, None) => return Err(ConfigError::NoScanPaths),
    };

    let mut scan_paths: Vec<PathBuf> = Vec::with_capacity(scan_paths_raw.len());
    for path in scan_paths_raw.iter().map(|p| expand_home(p)) {
        if !scan_paths.contains(&path) {
            scan_paths.push(path);
        }
    }

    let repo_path = raw.repo_path.map(|p| expand_home(&p)).ok_or(ConfigError::MissingRepoPath)?;
    let state_dir = match raw.state_dir {
        Some(dir) => expand_home(&dir),
        None => default_state_dir().ok_or(ConfigError::NoHomeDir)?,
    };

    let bytes_per_loc = raw
        .bytes_per_loc
        .into_iter()
        .map(|(language, value)| (language.trim().to_lowercase(), value))
        .collect();

    let exclude_globs = raw
        .excludes
        .globs
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect();

    Ok(AgentConfig {
        scan_paths,
        repo_path,
        interval_hours: raw.interval_hours,
        branch: raw.branch.trim().to_string(),
        remote: raw.remote.trim().to_string(),
        push: raw.push,
        exclude_globs,
        bytes_per_loc,
        split_subdirectories: raw.split_subdirectories,
        max_depth: raw.max_depth,
        scan_timeout: Duration::from_secs(raw.scan_timeout_secs.max(1)),
        max_entries_per_root: raw.max_entries_per_root.max(1),
        scan_workers: raw.scan_workers.clamp(1, MAX_SCAN_WORKERS),
        state_dir,
    })
}
