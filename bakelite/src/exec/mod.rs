//! Command execution for build steps.
//!
//! The package-manager steps (self-upgrade, install) shell out through a
//! `StepRunner`. The trait is the isolation seam: the default `HostRunner`
//! executes directly on the host against the build rootfs, and tests inject
//! a recording fake. Stronger isolation backends can slot in behind the
//! same trait without touching the pipeline.

mod host;

pub use host::HostRunner;
pub(crate) use host::exit_code;

use crate::errors::BakeResult;
use async_trait::async_trait;
use std::path::PathBuf;

/// A fully resolved command for one build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory, inside the build rootfs.
    pub cwd: PathBuf,
    /// Extra environment, `KEY=VALUE`.
    pub env: Vec<String>,
}

impl StepCommand {
    /// Build from an argv-style vector. Empty vectors are rejected upstream
    /// by option sanitization.
    pub fn from_argv(argv: &[String], cwd: PathBuf, env: Vec<String>) -> Self {
        Self {
            program: argv.first().cloned().unwrap_or_default(),
            args: argv.iter().skip(1).cloned().collect(),
            cwd,
            env,
        }
    }

    /// Single-line rendering for logs and layer instructions.
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured result of a step command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code; signal terminations surface as 128 + signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Executes step commands.
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn run(&self, command: &StepCommand) -> BakeResult<CommandOutput>;
}
