//! Step: working root selection.
//!
//! Records the fixed absolute workdir in the image config and creates it in
//! the rootfs so later steps can rely on it existing.

use super::{commit_layer, log_step_error, step_start};
use crate::build::types::{BuildCtx, BuildPhase};
use crate::errors::BakeResult;
use crate::pipeline::BuildStep;
use async_trait::async_trait;

pub struct WorkdirStep;

#[async_trait]
impl BuildStep<BuildCtx> for WorkdirStep {
    async fn run(self: Box<Self>, ctx: BuildCtx) -> BakeResult<()> {
        let step_name = self.name();
        let image_id = step_start(&ctx, step_name).await;

        let (workdir, workdir_path) = {
            let ctx = ctx.lock().await;
            (ctx.request.options.workdir.clone(), ctx.workdir_path())
        };

        let instruction = format!("WORKDIR {}", workdir);
        let fingerprint = instruction.clone();

        commit_layer(&ctx, BuildPhase::WorkdirSet, instruction, fingerprint, |_rootfs| async move {
            std::fs::create_dir_all(&workdir_path)?;
            Ok(())
        })
        .await
        .inspect_err(|e| log_step_error(&image_id, step_name, e))?;

        let mut ctx = ctx.lock().await;
        ctx.config.workdir = Some(workdir);
        Ok(())
    }

    fn name(&self) -> &str {
        "set_workdir"
    }
}
