//! Pseudonymization of project identities
//!
//! A project's identity is a keyed BLAKE3 hash of its canonical root path. The
//! key lives in the process-local state directory and is never published, so
//! an identifier cannot be traced back to a path without it. Losing or
//! rotating the key gives every project a new identity; history published
//! under the old identities is no longer linked to new activity.

pub mod key;

pub use key::{KeyError, PseudonymKey};

use crate::config::ConfigError;
use crate::domain::{ProjectIdentity, ScanRoot};
use crate::utils::normalize_path;
use std::collections::HashMap;
use std::path::Path;

/// Hex characters of the keyed digest kept in an identifier.
pub const IDENTITY_HEX_LEN: usize = 12;

pub struct Pseudonymizer {
    key: PseudonymKey,
}

impl Pseudonymizer {
    pub fn new(key: PseudonymKey) -> Self {
        Self { key }
    }

    /// Stable, one-way identity for a scan root.
    pub fn identify(&self, root: &Path) -> ProjectIdentity {
        let canonical = canonical_root(root);
        let digest = blake3::keyed_hash(self.key.as_bytes(), canonical.as_bytes());
        let hex = digest.to_hex();
        ProjectIdentity::from_digest_hex(&hex.as_str()[..IDENTITY_HEX_LEN])
    }

    /// Identify every root of a cycle.
    ///
    /// Roots resolving to the same canonical path are merged (the first one
    /// wins). Distinct paths landing on one identity are a fatal
    /// configuration error, never merged.
    pub fn assign(&self, roots: &[ScanRoot]) -> Result<Vec<(ScanRoot, ProjectIdentity)>, ConfigError> {
        let mut seen: HashMap<ProjectIdentity, String> = HashMap::new();
        let mut assigned = Vec::with_capacity(roots.len());

        for root in roots {
            let canonical = canonical_root(&root.path);
            let identity = self.identify(&root.path);
            match seen.get(&identity) {
                Some(existing) if *existing == canonical => {
                    tracing::warn!(identity = %identity, "Scan root listed twice; scanning it once");
                    continue;
                }
                Some(_) => {
                    return Err(ConfigError::IdentityCollision { identity: identity.to_string() });
                }
                None => {
                    seen.insert(identity.clone(), canonical);
                    assigned.push((root.clone(), identity));
                }
            }
        }
        Ok(assigned)
    }
}

/// Canonical string form of a root path: resolved when it exists, with
/// forward slashes and no trailing separator.
pub fn canonical_root(path: &Path) -> String {
    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let normalized = normalize_path(&resolved.to_string_lossy());
    let trimmed = normalized.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
