//! Step: package-manager self-upgrade.
//!
//! Runs unconditionally before dependency installation so the install never
//! resolves against a stale resolver. Cache semantics are the layer chain's:
//! an unchanged chain restores the upgraded snapshot instead of re-running
//! the command.

use super::{commit_layer, log_step_error, output_tail, step_start};
use crate::build::types::{BuildCtx, BuildPhase};
use crate::errors::{BakeError, BakeResult};
use crate::exec::StepCommand;
use crate::pipeline::BuildStep;
use async_trait::async_trait;

pub struct PkgUpgradeStep;

#[async_trait]
impl BuildStep<BuildCtx> for PkgUpgradeStep {
    async fn run(self: Box<Self>, ctx: BuildCtx) -> BakeResult<()> {
        let step_name = self.name();
        let image_id = step_start(&ctx, step_name).await;

        let (runner, argv, cwd, env) = {
            let ctx = ctx.lock().await;
            (
                ctx.runtime.runner.clone(),
                ctx.request.options.upgrade_command(),
                ctx.workdir_path(),
                ctx.config.env.clone(),
            )
        };

        let command = StepCommand::from_argv(&argv, cwd, env);
        let line = command.display_line();
        let instruction = format!("RUN {}", line);
        let fingerprint = instruction.clone();

        commit_layer(&ctx, BuildPhase::PkgManagerUpgraded, instruction, fingerprint, |_rootfs| async move {
            let output = runner.run(&command).await?;
            if !output.success() {
                return Err(BakeError::Deps(format!(
                    "package manager upgrade failed (exit {}): {}",
                    output.status,
                    output_tail(&output.stderr, 2000)
                )));
            }
            tracing::debug!(output = %output_tail(&output.stdout, 2000), "Package manager upgraded");
            Ok(())
        })
        .await
        .inspect_err(|e| log_step_error(&image_id, step_name, e))?;

        Ok(())
    }

    fn name(&self) -> &str {
        "pkg_upgrade"
    }
}
