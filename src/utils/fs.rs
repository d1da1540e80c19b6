//! Crash-safe file writes.

use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

/// Write `contents` to a temp file next to `path`, then rename it into place.
///
/// A crash mid-write leaves either the previous file or the new one, never a
/// truncated mix.
pub fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::Builder::new().prefix(".prolific-").suffix(".tmp").tempfile_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Pretty JSON with a trailing newline, written atomically.
pub fn atomic_write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    let mut body = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    body.push(b'\n');
    atomic_write(path, &body)
}
