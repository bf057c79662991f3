//! Per-version file locking so two processes never install the same version
//! into the same directory at once. The lock is released when dropped.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct VersionLock {
    _file: File,
    path: PathBuf,
}

impl VersionLock {
    /// Blocks until the exclusive lock at `path` is held.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::io(parent))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(Error::io(path))?;

        debug!(lock = %path.display(), "Waiting for version lock");
        file.lock_exclusive().map_err(Error::io(path))?;
        debug!(lock = %path.display(), "Version lock acquired");

        Ok(Self {
            _file: file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for VersionLock {
    fn drop(&mut self) {
        debug!(lock = %self.path.display(), "Version lock released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn second_holder_waits_for_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".staging").join("v1.2.3.lock");

        let first = VersionLock::acquire(&path).unwrap();
        let (tx, rx) = mpsc::channel();
        let contender_path = path.clone();
        let contender = thread::spawn(move || {
            let _second = VersionLock::acquire(&contender_path).unwrap();
            tx.send(()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        drop(first);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        contender.join().unwrap();
    }

    #[test]
    fn different_versions_do_not_contend() {
        let dir = tempfile::tempdir().unwrap();
        let _a = VersionLock::acquire(&dir.path().join("v1.0.0.lock")).unwrap();
        let _b = VersionLock::acquire(&dir.path().join("v2.0.0.lock")).unwrap();
    }
}
