//! Step: base environment acquisition.
//!
//! Resolves the pinned base reference through the runtime's `BaseProvider`
//! and seeds the build rootfs with the unpacked base. The layer fingerprint
//! includes the resolved digest, so a moved tag invalidates the whole chain
//! even though the reference text is unchanged.

use super::{commit_layer, log_step_error, step_start};
use crate::build::types::{BuildCtx, BuildPhase};
use crate::errors::{BakeError, BakeResult};
use crate::pipeline::BuildStep;
use crate::util::fs::{clear_dir, hardlink_tree};
use async_trait::async_trait;

pub struct AcquireBaseStep;

#[async_trait]
impl BuildStep<BuildCtx> for AcquireBaseStep {
    async fn run(self: Box<Self>, ctx: BuildCtx) -> BakeResult<()> {
        let step_name = self.name();
        let image_id = step_start(&ctx, step_name).await;

        let (provider, bases_dir, base_ref, extra_env) = {
            let ctx = ctx.lock().await;
            (
                ctx.runtime.base_provider.clone(),
                ctx.runtime.layout.bases_dir(),
                ctx.request.options.base.clone(),
                ctx.request.options.env.clone(),
            )
        };

        let base = provider
            .acquire(&base_ref, &bases_dir)
            .await
            .inspect_err(|e| log_step_error(&image_id, step_name, e))?;

        let instruction = format!("FROM {}", base_ref);
        let fingerprint = format!("FROM {}@{}", base_ref, base.digest);

        let base_rootfs = base.rootfs_dir.clone();
        commit_layer(&ctx, BuildPhase::BaseSelected, instruction, fingerprint, |rootfs| async move {
            // Seeding can move a whole runtime tree; keep it off the
            // async workers.
            tokio::task::spawn_blocking(move || -> BakeResult<()> {
                clear_dir(&rootfs)?;
                hardlink_tree(&base_rootfs, &rootfs)
            })
            .await
            .map_err(|e| BakeError::Internal(format!("base seed task failed: {}", e)))?
        })
        .await
        .inspect_err(|e| log_step_error(&image_id, step_name, e))?;

        // Config contribution happens hit or miss: the base's environment
        // defaults seed the image config, user env overrides on top.
        let mut ctx = ctx.lock().await;
        let mut config = base.config.clone();
        config.merge_env(extra_env);
        // workdir/cmd are owned by later steps
        config.workdir = None;
        config.cmd = Vec::new();
        ctx.config = config;
        ctx.base = Some(base);

        Ok(())
    }

    fn name(&self) -> &str {
        "acquire_base"
    }
}
