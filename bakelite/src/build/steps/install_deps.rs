//! Step: dependency installation.
//!
//! Requires the manifest to have been materialized into the workdir by the
//! copy step; a missing manifest fails the build here, not earlier. The
//! manifest is parsed for the build record, then the install command runs
//! through the step runner.

use super::{commit_layer, log_step_error, output_tail, step_start};
use crate::build::types::{BuildCtx, BuildPhase};
use crate::errors::{BakeError, BakeResult};
use crate::exec::StepCommand;
use crate::manifest::DependencyManifest;
use crate::pipeline::BuildStep;
use async_trait::async_trait;

pub struct InstallDepsStep;

#[async_trait]
impl BuildStep<BuildCtx> for InstallDepsStep {
    async fn run(self: Box<Self>, ctx: BuildCtx) -> BakeResult<()> {
        let step_name = self.name();
        let image_id = step_start(&ctx, step_name).await;

        let (runner, argv, manifest_name, cwd, env) = {
            let ctx = ctx.lock().await;
            (
                ctx.runtime.runner.clone(),
                ctx.request.options.install_command(),
                ctx.request.options.manifest.clone(),
                ctx.workdir_path(),
                ctx.config.env.clone(),
            )
        };

        let manifest_path = cwd.join(&manifest_name);
        let command = StepCommand::from_argv(&argv, cwd, env);
        let instruction = format!("RUN {}", command.display_line());
        let fingerprint = instruction.clone();

        commit_layer(&ctx, BuildPhase::DepsInstalled, instruction, fingerprint, |_rootfs| async move {
            let manifest = DependencyManifest::load(&manifest_path)?;
            tracing::info!(
                manifest = %manifest_path.display(),
                dependency_count = manifest.len(),
                "Installing dependencies"
            );

            let output = runner.run(&command).await?;
            if !output.success() {
                return Err(BakeError::Deps(format!(
                    "dependency install failed (exit {}): {}",
                    output.status,
                    output_tail(&output.stderr, 2000)
                )));
            }
            Ok(())
        })
        .await
        .inspect_err(|e| log_step_error(&image_id, step_name, e))?;

        Ok(())
    }

    fn name(&self) -> &str {
        "install_deps"
    }
}
