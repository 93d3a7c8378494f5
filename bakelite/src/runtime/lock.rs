//! Store ownership lock.
//!
//! The snapshot store and metadata database assume a single owning process;
//! the lock file holds the owner's PID. A lock left behind by a dead process
//! is reclaimed after a liveness check.

use crate::errors::{BakeError, BakeResult};
use crate::util::process::is_process_alive;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Held for the lifetime of a runtime; released on drop.
#[derive(Debug)]
pub struct RuntimeLock {
    path: PathBuf,
}

impl RuntimeLock {
    pub fn acquire(path: &Path) -> BakeResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // One reclaim attempt after clearing a stale lock
        for _ in 0..2 {
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
            {
                Ok(mut file) => {
                    write!(file, "{}", std::process::id())?;
                    tracing::debug!(lock = %path.display(), "Acquired store lock");
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    let holder = std::fs::read_to_string(path)
                        .ok()
                        .and_then(|s| s.trim().parse::<u32>().ok());
                    match holder {
                        Some(pid) if is_process_alive(pid) => {
                            return Err(BakeError::Storage(format!(
                                "store {} is locked by running process {}",
                                path.display(),
                                pid
                            )));
                        }
                        _ => {
                            tracing::warn!(lock = %path.display(), "Clearing stale store lock");
                            let _ = std::fs::remove_file(path);
                        }
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(BakeError::Storage(format!(
            "could not acquire store lock at {}",
            path.display()
        )))
    }
}

impl Drop for RuntimeLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("store.lock");

        let lock = RuntimeLock::acquire(&path).unwrap();
        assert!(path.exists());
        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_second_acquire_fails_while_held() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("store.lock");

        let _lock = RuntimeLock::acquire(&path).unwrap();
        let err = RuntimeLock::acquire(&path).unwrap_err();
        assert!(matches!(err, BakeError::Storage(_)));
    }

    #[test]
    fn test_stale_lock_is_reclaimed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("store.lock");
        // PID unlikely to exist
        std::fs::write(&path, "999999999").unwrap();

        let lock = RuntimeLock::acquire(&path).unwrap();
        drop(lock);
    }
}
