//! Host-process step runner.

use super::{CommandOutput, StepCommand, StepRunner};
use crate::errors::{BakeError, BakeResult};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Runs step commands as host processes with the step's rootfs workdir as
/// cwd, capturing stdout/stderr for the build log.
pub struct HostRunner;

#[async_trait]
impl StepRunner for HostRunner {
    async fn run(&self, command: &StepCommand) -> BakeResult<CommandOutput> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for entry in &command.env {
            if let Some((key, value)) = entry.split_once('=') {
                cmd.env(key, value);
            }
        }

        tracing::debug!(
            program = %command.program,
            cwd = %command.cwd.display(),
            "Spawning step command"
        );

        let output = cmd.output().await.map_err(|e| {
            BakeError::Deps(format!(
                "failed to spawn {:?}: {}",
                command.display_line(),
                e
            ))
        })?;

        let status = exit_code(&output.status);
        Ok(CommandOutput {
            status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

pub(crate) fn exit_code(status: &std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    // Terminated by signal (unix only)
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
