//! Step: entry command registration.
//!
//! Config-only terminal layer: records the entry command for launch time.
//! The entry file's existence is deliberately not checked here. A context
//! without it builds fine and fails at launch, which is the launch
//! contract's problem to report.

use super::{commit_layer, log_step_error, step_start};
use crate::build::types::{BuildCtx, BuildPhase};
use crate::errors::{BakeError, BakeResult};
use crate::pipeline::BuildStep;
use async_trait::async_trait;

pub struct EntrypointStep;

#[async_trait]
impl BuildStep<BuildCtx> for EntrypointStep {
    async fn run(self: Box<Self>, ctx: BuildCtx) -> BakeResult<()> {
        let step_name = self.name();
        let image_id = step_start(&ctx, step_name).await;

        let entry_cmd = {
            let ctx = ctx.lock().await;
            ctx.request.options.entry_cmd.clone()
        };

        let rendered = serde_json::to_string(&entry_cmd)
            .map_err(|e| BakeError::Internal(format!("entry command serialization: {}", e)))?;
        let instruction = format!("CMD {}", rendered);
        let fingerprint = instruction.clone();

        commit_layer(&ctx, BuildPhase::EntrypointSet, instruction, fingerprint, |_rootfs| async move {
            Ok(())
        })
        .await
        .inspect_err(|e| log_step_error(&image_id, step_name, e))?;

        let mut ctx = ctx.lock().await;
        ctx.config.cmd = entry_cmd;
        Ok(())
    }

    fn name(&self) -> &str {
        "set_entrypoint"
    }
}
