//! Step: source materialization.
//!
//! Copies the entire build context into the image workdir, preserving
//! relative paths. The layer fingerprint hashes every file's path, mode and
//! content in walk order, so any context edit invalidates this layer and
//! everything after it.

use super::{commit_layer, log_step_error, step_start};
use crate::build::types::{BuildCtx, BuildPhase};
use crate::errors::{BakeError, BakeResult};
use crate::pipeline::BuildStep;
use crate::util::digest::{Fingerprint, file_sha256_hex};
use crate::util::fs::copy_tree;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub struct CopySourcesStep;

#[async_trait]
impl BuildStep<BuildCtx> for CopySourcesStep {
    async fn run(self: Box<Self>, ctx: BuildCtx) -> BakeResult<()> {
        let step_name = self.name();
        let image_id = step_start(&ctx, step_name).await;

        let (context_dir, workdir, workdir_path) = {
            let ctx = ctx.lock().await;
            (
                ctx.request.context_dir.clone(),
                ctx.request.options.workdir.clone(),
                ctx.workdir_path(),
            )
        };

        if !context_dir.is_dir() {
            let err = BakeError::Context(format!(
                "build context is not a directory: {}",
                context_dir.display()
            ));
            log_step_error(&image_id, step_name, &err);
            return Err(err);
        }

        let hash_root = context_dir.clone();
        let context_hash = tokio::task::spawn_blocking(move || context_fingerprint(&hash_root))
            .await
            .map_err(|e| BakeError::Internal(format!("context hash task failed: {}", e)))?
            .inspect_err(|e| log_step_error(&image_id, step_name, e))?;

        let instruction = format!("COPY . {}", workdir);
        let fingerprint = format!("COPY . {} @{}", workdir, context_hash);

        commit_layer(&ctx, BuildPhase::SourcesCopied, instruction, fingerprint, |_rootfs| async move {
            let copied = tokio::task::spawn_blocking(move || copy_tree(&context_dir, &workdir_path))
                .await
                .map_err(|e| BakeError::Internal(format!("context copy task failed: {}", e)))?
                .map_err(|e| BakeError::Context(e.to_string()))?;
            tracing::info!(files = copied, "Materialized build context");
            Ok(())
        })
        .await
        .inspect_err(|e| log_step_error(&image_id, step_name, e))?;

        Ok(())
    }

    fn name(&self) -> &str {
        "copy_sources"
    }
}

/// Content hash of the build context: relative path, entry kind, unix mode
/// and file content, in a deterministic walk order.
fn context_fingerprint(context: &Path) -> BakeResult<String> {
    let mut hasher = Fingerprint::new();

    for entry in WalkDir::new(context)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| BakeError::Context(format!("context walk failed: {}", e)))?;
        let rel: PathBuf = entry
            .path()
            .strip_prefix(context)
            .map_err(|e| BakeError::Internal(format!("path outside context: {}", e)))?
            .to_path_buf();
        if rel.as_os_str().is_empty() {
            continue;
        }

        hasher.field(&rel.to_string_lossy());

        let file_type = entry.file_type();
        if file_type.is_dir() {
            hasher.field("dir");
        } else if file_type.is_symlink() {
            let target = std::fs::read_link(entry.path())?;
            hasher.field("symlink");
            hasher.field(&target.to_string_lossy());
        } else {
            let meta = entry.metadata().map_err(std::io::Error::from)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                hasher.field(&format!("{:o}", meta.permissions().mode() & 0o7777));
            }
            #[cfg(not(unix))]
            hasher.field(if meta.permissions().readonly() { "ro" } else { "rw" });
            hasher.field(&file_sha256_hex(entry.path())?);
        }
    }

    Ok(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("main.py"), b"print('ok')").unwrap();
        std::fs::write(tmp.path().join("requirements.txt"), b"requests==2.31.0").unwrap();

        let a = context_fingerprint(tmp.path()).unwrap();
        let b = context_fingerprint(tmp.path()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("main.py"), b"print('ok')").unwrap();
        let before = context_fingerprint(tmp.path()).unwrap();

        std::fs::write(tmp.path().join("main.py"), b"print('changed')").unwrap();
        let after = context_fingerprint(tmp.path()).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_fingerprint_changes_with_rename() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.py"), b"x").unwrap();
        let before = context_fingerprint(tmp.path()).unwrap();

        std::fs::rename(tmp.path().join("a.py"), tmp.path().join("b.py")).unwrap();
        let after = context_fingerprint(tmp.path()).unwrap();
        assert_ne!(before, after);
    }
}
