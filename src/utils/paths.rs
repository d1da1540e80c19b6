//! Path normalization and well-known locations

use std::path::{Component, Path, PathBuf};

pub fn normalize_path(path: &str) -> String {
    // Convert backslashes to forward slashes and normalize
    path.replace('\\', "/")
}

pub fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("USERPROFILE").map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("HOME").map(PathBuf::from)
    }
}

/// Process-local state directory (`~/.prolific`). Never inside the published repo.
pub fn default_state_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".prolific"))
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match home_dir() {
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

/// True for `/` or a bare drive root such as `C:\`.
pub fn is_filesystem_root(path: &Path) -> bool {
    path.parent().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backslashes() {
        assert_eq!(normalize_path("src\\lib\\mod.rs"), "src/lib/mod.rs");
    }

    #[test]
    fn expands_tilde_prefix_only() {
        let expanded = expand_home(Path::new("~/code"));
        if let Some(home) = home_dir() {
            assert_eq!(expanded, home.join("code"));
        }
        assert_eq!(expand_home(Path::new("/abs/~/x")), PathBuf::from("/abs/~/x"));
    }

    #[cfg(unix)]
    #[test]
    fn detects_filesystem_root() {
        assert!(is_filesystem_root(Path::new("/")));
        assert!(!is_filesystem_root(Path::new("/home")));
    }
}
