//! Cross-process mutual exclusion for cycles.

use super::StoreError;
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE_NAME: &str = "cycle.lock";

/// Exclusive lock held for the duration of one cycle.
///
/// A second trigger (manual run while the scheduled one is in progress)
/// blocks in [`ProcessLock::acquire`] until the first cycle releases it.
#[derive(Debug)]
pub struct ProcessLock {
    file: File,
    path: PathBuf,
}

impl ProcessLock {
    pub fn acquire(state_dir: &Path) -> Result<Self, StoreError> {
        let path = state_dir.join(LOCK_FILE_NAME);
        let lock_err = |source| StoreError::Lock { path: path.clone(), source };

        std::fs::create_dir_all(state_dir).map_err(lock_err)?;
        let file = OpenOptions::new().create(true).read(true).write(true).truncate(false).open(&path).map_err(lock_err)?;

        tracing::debug!(path = %path.display(), "Acquiring cycle lock");
        FileExt::lock_exclusive(&file).map_err(lock_err)?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn second_acquire_waits_for_release() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let first = ProcessLock::acquire(&dir).expect("first lock");

        let (tx, rx) = mpsc::channel();
        let waiter_dir = dir.clone();
        let waiter = std::thread::spawn(move || {
            let lock = ProcessLock::acquire(&waiter_dir).expect("second lock");
            tx.send(()).expect("send");
            drop(lock);
        });

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err(), "second lock acquired while first held");
        drop(first);
        rx.recv_timeout(Duration::from_secs(10)).expect("second lock acquired after release");
        waiter.join().expect("join");
    }
}
