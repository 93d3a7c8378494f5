//! Tree copy and hardlink-clone primitives for the snapshot store.
//!
//! Snapshots are whole-tree clones. Hardlinks keep them cheap: committed
//! layer content is immutable, so sharing inodes between the store and a
//! build rootfs is safe as long as mutating steps replace files instead of
//! writing through them (the package-manager convention).

use crate::errors::{BakeError, BakeResult};
use filetime::FileTime;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Recursively copy `src` into `dst`, preserving relative paths, permissions
/// and modification times. Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path) -> BakeResult<u64> {
    if !src.is_dir() {
        return Err(BakeError::Storage(format!(
            "copy source is not a directory: {}",
            src.display()
        )));
    }
    fs::create_dir_all(dst)?;

    let mut copied = 0u64;
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| BakeError::Storage(format!("walk failed: {}", e)))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| BakeError::Internal(format!("path outside walk root: {}", e)))?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            remove_existing(&target)?;
            #[cfg(unix)]
            std::os::unix::fs::symlink(&link, &target)?;
            #[cfg(not(unix))]
            return Err(BakeError::Storage(format!(
                "symlinks unsupported on this platform: {}",
                target.display()
            )));
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            remove_existing(&target)?;
            fs::copy(entry.path(), &target)?;
            let meta = entry.metadata().map_err(std::io::Error::from)?;
            let mtime = FileTime::from_last_modification_time(&meta);
            filetime::set_file_mtime(&target, mtime)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Clone `src` into `dst` using hardlinks for regular files.
///
/// Falls back to a byte copy when linking fails (cross-device stores).
pub fn hardlink_tree(src: &Path, dst: &Path) -> BakeResult<()> {
    if !src.is_dir() {
        return Err(BakeError::Storage(format!(
            "clone source is not a directory: {}",
            src.display()
        )));
    }
    fs::create_dir_all(dst)?;

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| BakeError::Storage(format!("walk failed: {}", e)))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| BakeError::Internal(format!("path outside walk root: {}", e)))?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            remove_existing(&target)?;
            #[cfg(unix)]
            std::os::unix::fs::symlink(&link, &target)?;
            #[cfg(not(unix))]
            return Err(BakeError::Storage(format!(
                "symlinks unsupported on this platform: {}",
                target.display()
            )));
        } else {
            remove_existing(&target)?;
            if fs::hard_link(entry.path(), &target).is_err() {
                fs::copy(entry.path(), &target)?;
            }
        }
    }
    Ok(())
}

/// Remove a directory tree if present. Missing trees are not an error.
pub fn remove_tree_if_exists(path: &Path) -> BakeResult<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Empty a directory without removing the directory itself.
pub fn clear_dir(path: &Path) -> BakeResult<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
        return Ok(());
    }
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let child = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&child)?;
        } else {
            fs::remove_file(&child)?;
        }
    }
    Ok(())
}

fn remove_existing(path: &Path) -> BakeResult<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) => {
            if meta.is_dir() {
                fs::remove_dir_all(path)?;
            } else {
                fs::remove_file(path)?;
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(dir: &Path) {
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(dir.join("a.txt"), b"alpha").unwrap();
        fs::write(dir.join("sub/b.txt"), b"beta").unwrap();
    }

    #[test]
    fn test_copy_tree_preserves_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        seed(&src);

        let copied = copy_tree(&src, &dst).unwrap();
        assert_eq!(copied, 2);
        assert_eq!(fs::read(dst.join("a.txt")).unwrap(), b"alpha");
        assert_eq!(fs::read(dst.join("sub/b.txt")).unwrap(), b"beta");
    }

    #[test]
    fn test_copy_tree_rejects_file_source() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("plain");
        fs::write(&file, b"x").unwrap();
        assert!(copy_tree(&file, &tmp.path().join("out")).is_err());
    }

    #[test]
    fn test_hardlink_tree_shares_content() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        seed(&src);

        hardlink_tree(&src, &dst).unwrap();
        assert_eq!(fs::read(dst.join("sub/b.txt")).unwrap(), b"beta");
    }

    #[test]
    fn test_clear_dir_leaves_root() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("d");
        fs::create_dir_all(dir.join("inner")).unwrap();
        fs::write(dir.join("f"), b"x").unwrap();

        clear_dir(&dir).unwrap();
        assert!(dir.exists());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }
}
