//! Image launch.
//!
//! Launch is a runtime event separate from the build: clone the image's
//! head snapshot into a writable container rootfs, start exactly the
//! registered entry command in the image workdir, wait, and hand the exit
//! code back unchanged. No arguments are appended and no environment is
//! injected beyond the image config.

use crate::errors::{BakeError, BakeResult};
use crate::exec::exit_code;
use crate::images::{ImageConfig, ImageId, ImageRecord, ImageRef};
use crate::runtime::RuntimeInner;
use crate::util::fs::{hardlink_tree, remove_tree_if_exists};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Launch the entry command of `reference` and wait for it to exit.
pub(crate) async fn launch_image(runtime: &RuntimeInner, reference: &str) -> BakeResult<i32> {
    let image_ref = ImageRef::parse(reference)?;
    let record = runtime
        .images
        .get(&image_ref)?
        .ok_or_else(|| BakeError::NotFound(image_ref.to_string()))?;

    let head = record
        .head_key()
        .ok_or_else(|| BakeError::Internal(format!("image {} has no layers", image_ref)))?;
    let snapshots = runtime.images.snapshots();
    if !snapshots.contains(head) {
        return Err(BakeError::Storage(format!(
            "snapshot for {} missing from store (key {})",
            image_ref,
            head.short()
        )));
    }

    if record.config.cmd.is_empty() {
        return Err(BakeError::Launch(format!(
            "image {} has no entry command",
            image_ref
        )));
    }

    // Writable per-launch clone; the snapshot itself stays immutable.
    let container_id = ImageId::new();
    let container_dir = runtime.layout.containers_dir().join(container_id.as_str());
    let container_rootfs = container_dir.join("rootfs");

    let snapshot_rootfs = snapshots.rootfs_path(head);
    let clone_target = container_rootfs.clone();
    tokio::task::spawn_blocking(move || hardlink_tree(&snapshot_rootfs, &clone_target))
        .await
        .map_err(|e| BakeError::Internal(format!("rootfs clone task failed: {}", e)))??;

    tracing::info!(
        container_id = %container_id.short(),
        reference = %image_ref,
        command = ?record.config.cmd,
        "Launching entry command"
    );

    let status = run_entry(&record, &container_rootfs).await;

    // Best-effort cleanup; a leftover dir is harmless and visible
    if let Err(e) = remove_tree_if_exists(&container_dir) {
        tracing::warn!(
            container_id = %container_id.short(),
            error = %e,
            "Failed to remove container directory"
        );
    }

    let code = status?;
    tracing::info!(
        container_id = %container_id.short(),
        exit_code = code,
        "Entry command exited"
    );
    Ok(code)
}

async fn run_entry(record: &ImageRecord, rootfs: &Path) -> BakeResult<i32> {
    let cmd = &record.config.cmd;
    let program = resolve_program(rootfs, &record.config, &cmd[0]);

    let workdir = record.config.workdir.as_deref().unwrap_or("/");
    let cwd = rootfs.join(workdir.trim_start_matches('/'));
    if !cwd.is_dir() {
        return Err(BakeError::Launch(format!(
            "image workdir {} missing from rootfs",
            workdir
        )));
    }

    let mut command = Command::new(&program);
    command
        .args(&cmd[1..])
        .current_dir(&cwd)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    for entry in &record.config.env {
        if let Some((key, value)) = entry.split_once('=') {
            command.env(key, value);
        }
    }

    let status = command.status().await.map_err(|e| {
        BakeError::Launch(format!(
            "failed to start entry command {:?}: {}",
            cmd.join(" "),
            e
        ))
    })?;
    Ok(exit_code(&status))
}

/// Resolve the entry interpreter against the image rootfs first.
///
/// Absolute programs and bare names are looked up under the rootfs (via
/// the image's own `PATH` for bare names); when the image doesn't carry
/// the binary the name falls through unchanged to the host `PATH`.
fn resolve_program(rootfs: &Path, config: &ImageConfig, program: &str) -> PathBuf {
    if program.starts_with('/') {
        let in_rootfs = rootfs.join(program.trim_start_matches('/'));
        if in_rootfs.is_file() {
            return in_rootfs;
        }
        return PathBuf::from(program);
    }

    if !program.contains('/') {
        for dir in config.path_entries() {
            let candidate = rootfs.join(dir.trim_start_matches('/')).join(program);
            if candidate.is_file() {
                return candidate;
            }
        }
    }

    PathBuf::from(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_path() -> ImageConfig {
        ImageConfig {
            env: vec!["PATH=/usr/local/bin:/usr/bin".into()],
            workdir: Some("/app".into()),
            cmd: vec!["python".into(), "main.py".into()],
        }
    }

    #[test]
    fn test_resolve_prefers_rootfs_path_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let rootfs = tmp.path();
        std::fs::create_dir_all(rootfs.join("usr/local/bin")).unwrap();
        std::fs::write(rootfs.join("usr/local/bin/python"), b"#!stub").unwrap();

        let resolved = resolve_program(rootfs, &config_with_path(), "python");
        assert_eq!(resolved, rootfs.join("usr/local/bin/python"));
    }

    #[test]
    fn test_resolve_falls_back_to_host_name() {
        let tmp = tempfile::tempdir().unwrap();
        let resolved = resolve_program(tmp.path(), &config_with_path(), "python");
        assert_eq!(resolved, PathBuf::from("python"));
    }

    #[test]
    fn test_resolve_absolute_inside_rootfs() {
        let tmp = tempfile::tempdir().unwrap();
        let rootfs = tmp.path();
        std::fs::create_dir_all(rootfs.join("usr/bin")).unwrap();
        std::fs::write(rootfs.join("usr/bin/env"), b"#!stub").unwrap();

        let resolved = resolve_program(rootfs, &config_with_path(), "/usr/bin/env");
        assert_eq!(resolved, rootfs.join("usr/bin/env"));

        let missing = resolve_program(rootfs, &config_with_path(), "/usr/bin/nope");
        assert_eq!(missing, PathBuf::from("/usr/bin/nope"));
    }
}
