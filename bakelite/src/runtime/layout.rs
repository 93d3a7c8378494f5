//! Store filesystem layout.
//!
//! ```text
//! $BAKELITE_HOME/
//! ├── bakelite.db      metadata database
//! ├── bakelite.lock    store ownership lock
//! ├── snapshots/       content-addressed layer snapshots
//! ├── bases/           unpacked base image cache
//! ├── containers/      per-launch writable rootfs clones
//! ├── tmp/             build workspaces (same filesystem as snapshots,
//! │                    so commits can hardlink)
//! └── logs/            rolling log files
//! ```

use super::constants::{dirnames, filenames};
use crate::errors::BakeResult;
use std::path::{Path, PathBuf};

/// Immutable after init; cheap to clone.
#[derive(Debug, Clone)]
pub struct FilesystemLayout {
    home: PathBuf,
}

impl FilesystemLayout {
    pub fn new(home: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
        }
    }

    /// Create every directory the store needs.
    pub fn init(&self) -> BakeResult<()> {
        for dir in [
            self.home.clone(),
            self.snapshots_dir(),
            self.bases_dir(),
            self.containers_dir(),
            self.tmp_dir(),
            self.logs_dir(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    pub fn home_dir(&self) -> &Path {
        &self.home
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.home.join(dirnames::SNAPSHOTS)
    }

    pub fn bases_dir(&self) -> PathBuf {
        self.home.join(dirnames::BASES)
    }

    pub fn containers_dir(&self) -> PathBuf {
        self.home.join(dirnames::CONTAINERS)
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.home.join(dirnames::TMP)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.home.join(dirnames::LOGS)
    }

    pub fn db_path(&self) -> PathBuf {
        self.home.join(filenames::DB_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.home.join(filenames::LOCK_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_all_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = FilesystemLayout::new(&tmp.path().join("store"));
        layout.init().unwrap();

        assert!(layout.snapshots_dir().is_dir());
        assert!(layout.bases_dir().is_dir());
        assert!(layout.containers_dir().is_dir());
        assert!(layout.tmp_dir().is_dir());
        assert!(layout.logs_dir().is_dir());
    }
}
