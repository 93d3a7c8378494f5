//! Content-addressed snapshot store.
//!
//! One snapshot per committed pipeline step: the complete rootfs tree as it
//! stood after that step, addressed by the step's cumulative cache key.
//! Snapshots are immutable once committed; commit goes through a temp
//! directory and a final rename so an interrupted commit never leaves a
//! half-written entry under its key.

use crate::errors::{BakeError, BakeResult};
use crate::util::digest::Fingerprint;
use crate::util::fs::{clear_dir, hardlink_tree, remove_tree_if_exists};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Cumulative cache key of a layer.
///
/// `key_n = sha256(key_{n-1} || fingerprint_n)`, so editing a step or any
/// predecessor changes every downstream key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerKey(String);

impl LayerKey {
    pub fn derive(parent: Option<&LayerKey>, fingerprint: &str) -> Self {
        let mut hasher = Fingerprint::new();
        hasher.field(parent.map(|k| k.0.as_str()).unwrap_or(""));
        hasher.field(fingerprint);
        Self(hasher.finish())
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl std::fmt::Display for LayerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Directory-backed snapshot store.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: &Path) -> BakeResult<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn contains(&self, key: &LayerKey) -> bool {
        self.entry_path(key).is_dir()
    }

    /// Rootfs directory of a committed snapshot.
    pub fn rootfs_path(&self, key: &LayerKey) -> PathBuf {
        self.entry_path(key).join("rootfs")
    }

    /// Commit the current rootfs under `key`.
    ///
    /// Clones into a temp sibling first, then renames into place. Committing
    /// a key that already exists is a no-op (the content is identical by
    /// construction of the key).
    pub fn commit(&self, key: &LayerKey, rootfs: &Path) -> BakeResult<()> {
        if self.contains(key) {
            tracing::trace!(key = %key.short(), "Snapshot already committed");
            return Ok(());
        }

        let staging = self.root.join(format!(".tmp-{}", key.short()));
        remove_tree_if_exists(&staging)?;
        hardlink_tree(rootfs, &staging.join("rootfs"))?;

        let final_path = self.entry_path(key);
        match std::fs::rename(&staging, &final_path) {
            Ok(()) => Ok(()),
            // Lost a race with another commit of the same key; theirs wins.
            Err(_) if final_path.is_dir() => remove_tree_if_exists(&staging),
            Err(e) => Err(BakeError::Storage(format!(
                "failed to commit snapshot {}: {}",
                key.short(),
                e
            ))),
        }
    }

    /// Restore a committed snapshot into `rootfs`, replacing its contents.
    pub fn restore(&self, key: &LayerKey, rootfs: &Path) -> BakeResult<()> {
        if !self.contains(key) {
            return Err(BakeError::Storage(format!(
                "snapshot not found in store: {}",
                key.short()
            )));
        }
        clear_dir(rootfs)?;
        hardlink_tree(&self.rootfs_path(key), rootfs)
    }

    pub fn remove(&self, key: &LayerKey) -> BakeResult<()> {
        remove_tree_if_exists(&self.entry_path(key))
    }

    fn entry_path(&self, key: &LayerKey) -> PathBuf {
        self.root.join(key.as_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_chained() {
        let a = LayerKey::derive(None, "FROM python");
        let b = LayerKey::derive(Some(&a), "WORKDIR /app");
        let b_other_parent = LayerKey::derive(None, "WORKDIR /app");
        assert_ne!(a, b);
        assert_ne!(b, b_other_parent);
        // Same inputs reproduce the same key
        assert_eq!(b, LayerKey::derive(Some(&a), "WORKDIR /app"));
    }

    #[test]
    fn test_commit_restore_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(&tmp.path().join("snapshots")).unwrap();
        let rootfs = tmp.path().join("rootfs");
        std::fs::create_dir_all(rootfs.join("app")).unwrap();
        std::fs::write(rootfs.join("app/main.py"), b"print('ok')").unwrap();

        let key = LayerKey::derive(None, "COPY");
        store.commit(&key, &rootfs).unwrap();
        assert!(store.contains(&key));

        // Mutate the working tree, then restore the snapshot over it
        std::fs::write(rootfs.join("app/main.py"), b"changed").unwrap();
        std::fs::write(rootfs.join("stray"), b"x").unwrap();
        store.restore(&key, &rootfs).unwrap();

        assert_eq!(
            std::fs::read(rootfs.join("app/main.py")).unwrap(),
            b"print('ok')"
        );
        assert!(!rootfs.join("stray").exists());
    }

    #[test]
    fn test_restore_missing_key_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(&tmp.path().join("snapshots")).unwrap();
        let key = LayerKey::derive(None, "nope");
        assert!(store.restore(&key, &tmp.path().join("rootfs")).is_err());
    }
}
