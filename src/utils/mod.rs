//! Shared helpers

pub mod fs;
pub mod paths;

pub use fs::{atomic_write, atomic_write_json};
pub use paths::{default_state_dir, expand_home, home_dir, is_filesystem_root, normalize_path};
