//! Build pipeline steps.
//!
//! One step per phase, each committing exactly one layer:
//!
//! ```text
//! AcquireBase → Workdir → CopySources → PkgUpgrade → InstallDeps → Entrypoint
//! ```
//!
//! Steps share the commit-or-restore flow in [`commit_layer`]: derive the
//! cumulative cache key, restore the snapshot on a hit, otherwise execute
//! the step body against the rootfs and commit the result. Either way the
//! layer is recorded and the phase advances.

pub mod acquire_base;
pub mod copy_sources;
pub mod entrypoint;
pub mod install_deps;
pub mod pkg_upgrade;
pub mod workdir;

pub use acquire_base::AcquireBaseStep;
pub use copy_sources::CopySourcesStep;
pub use entrypoint::EntrypointStep;
pub use install_deps::InstallDepsStep;
pub use pkg_upgrade::PkgUpgradeStep;
pub use workdir::WorkdirStep;

use super::types::{BuildCtx, BuildPhase};
use crate::errors::{BakeError, BakeResult};
use crate::images::{LayerKey, LayerRecord};
use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;

/// Log step entry and hand back the image id for later log lines.
pub(crate) async fn step_start(ctx: &BuildCtx, step_name: &str) -> String {
    let ctx = ctx.lock().await;
    let image_id = ctx.image_id.short().to_string();
    tracing::debug!(
        image_id = %image_id,
        reference = %ctx.image_ref,
        step = step_name,
        "Starting build step"
    );
    image_id
}

pub(crate) fn log_step_error(image_id: &str, step_name: &str, err: &BakeError) {
    tracing::error!(image_id = %image_id, step = step_name, error = %err, "Build step failed");
}

/// Commit-or-restore one layer.
///
/// `execute` receives the rootfs path and applies the step's filesystem
/// effects; it only runs on a cache miss. Config changes do not belong
/// here: they are reapplied by the caller on every build, hit or miss, so
/// cached builds still produce a complete image config.
pub(crate) async fn commit_layer<F, Fut>(
    ctx: &BuildCtx,
    phase: BuildPhase,
    instruction: String,
    fingerprint: String,
    execute: F,
) -> BakeResult<LayerKey>
where
    F: FnOnce(PathBuf) -> Fut + Send,
    Fut: Future<Output = BakeResult<()>> + Send,
{
    let start = Instant::now();

    let (snapshots, rootfs, parent) = {
        let ctx = ctx.lock().await;
        (
            ctx.runtime.images.snapshots().clone(),
            ctx.rootfs.clone(),
            ctx.head.clone(),
        )
    };

    let key = LayerKey::derive(parent.as_ref(), &fingerprint);
    let cached = snapshots.contains(&key);

    if cached {
        snapshots.restore(&key, &rootfs)?;
        tracing::info!(key = %key.short(), instruction = %instruction, "Layer cache hit");
    } else {
        execute(rootfs.clone()).await?;
        snapshots.commit(&key, &rootfs)?;
        tracing::info!(
            key = %key.short(),
            instruction = %instruction,
            duration_ms = start.elapsed().as_millis() as u64,
            "Committed layer"
        );
    }

    let mut ctx = ctx.lock().await;
    ctx.head = Some(key.clone());
    ctx.layers.push(LayerRecord {
        key: key.clone(),
        instruction,
        cached,
        duration_ms: start.elapsed().as_millis() as u64,
    });
    ctx.advance_to(phase)?;
    Ok(key)
}

/// Trim command output for error messages, keeping the tail where package
/// managers put the actual failure.
pub(crate) fn output_tail(output: &str, max_chars: usize) -> &str {
    if output.len() <= max_chars {
        return output.trim_end();
    }
    let start = output.len() - max_chars;
    let start = output
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| i >= start)
        .unwrap_or(start);
    output[start..].trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_tail_keeps_short_output() {
        assert_eq!(output_tail("error: boom\n", 100), "error: boom");
    }

    #[test]
    fn test_output_tail_truncates_long_output() {
        let long = "x".repeat(50) + "tail";
        let tail = output_tail(&long, 8);
        assert_eq!(tail, "xxxxtail");
    }
}
