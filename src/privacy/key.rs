//! Local secret used to key project identities.

use crate::utils::atomic_write;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

const KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to read pseudonym key {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write pseudonym key {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pseudonym key {path} is malformed (expected {expected} hex characters)")]
    Malformed { path: PathBuf, expected: usize },
}

#[derive(Clone)]
pub struct PseudonymKey([u8; KEY_LEN]);

impl fmt::Debug for PseudonymKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PseudonymKey(<redacted>)")
    }
}

impl PseudonymKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn generate() -> Self {
        Self(rand::random())
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Read the key at `path`, or `None` if it has not been created yet.
    pub fn load(path: &Path) -> Result<Option<Self>, KeyError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(KeyError::Read { path: path.to_path_buf(), source }),
        };
        decode_hex(text.trim())
            .map(|bytes| Some(Self(bytes)))
            .ok_or_else(|| KeyError::Malformed { path: path.to_path_buf(), expected: KEY_LEN * 2 })
    }

    /// Load the installation key, creating it on first use.
    pub fn load_or_create(path: &Path) -> Result<Self, KeyError> {
        if let Some(key) = Self::load(path)? {
            return Ok(key);
        }
        let key = Self::generate();
        key.store(path)?;
        tracing::info!(path = %path.display(), "Created new pseudonym key");
        Ok(key)
    }

    /// Replace the installation key. Every project identity changes afterwards.
    pub fn rotate(path: &Path) -> Result<Self, KeyError> {
        let key = Self::generate();
        key.store(path)?;
        tracing::warn!(
            path = %path.display(),
            "Rotated pseudonym key; all project identities will change from the next cycle"
        );
        Ok(key)
    }

    fn store(&self, path: &Path) -> Result<(), KeyError> {
        let write_err = |source| KeyError::Write { path: path.to_path_buf(), source };
        atomic_write(path, encode_hex(&self.0).as_bytes()).map_err(write_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(write_err)?;
        }
        Ok(())
    }
}

fn encode_hex(bytes: &[u8; KEY_LEN]) -> String {
    blake3::Hash::from_bytes(*bytes).to_hex().to_string()
}

fn decode_hex(text: &str) -> Option<[u8; KEY_LEN]> {
    blake3::Hash::from_hex(text).ok().map(|hash| *hash.as_bytes())
}
