//! Shared test fixtures: an offline base provider and a recording runner.
#![allow(dead_code)]

use async_trait::async_trait;
use bakelite::{
    BakeResult, BaseImage, BaseProvider, CommandOutput, ImageConfig, StepCommand, StepRunner,
};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Base provider that materializes a tiny fixed rootfs locally.
pub struct FixtureBaseProvider;

#[async_trait]
impl BaseProvider for FixtureBaseProvider {
    async fn acquire(&self, reference: &str, cache_dir: &Path) -> BakeResult<BaseImage> {
        let entry_dir = cache_dir.join("fixture");
        let rootfs_dir = entry_dir.join("rootfs");
        if !rootfs_dir.is_dir() {
            std::fs::create_dir_all(rootfs_dir.join("etc"))?;
            std::fs::create_dir_all(rootfs_dir.join("usr/local/lib"))?;
            std::fs::write(rootfs_dir.join("etc/os-release"), b"NAME=fixture\n")?;
            std::fs::write(rootfs_dir.join("usr/local/lib/marker.txt"), b"base\n")?;
        }
        Ok(BaseImage {
            reference: reference.to_string(),
            digest: "sha256:fixturedigest".to_string(),
            rootfs_dir,
            config: ImageConfig {
                env: vec![
                    "PATH=/usr/local/bin:/usr/bin:/bin".to_string(),
                    "LANG=C.UTF-8".to_string(),
                ],
                workdir: None,
                cmd: vec![],
            },
        })
    }
}

/// Runner that records every command instead of executing it.
///
/// Commands matching `fail_marker` report exit code 1 with a canned stderr.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    pub commands: Arc<Mutex<Vec<StepCommand>>>,
    pub fail_marker: Option<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            commands: Arc::new(Mutex::new(Vec::new())),
            fail_marker: Some(marker.to_string()),
        }
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.commands
            .lock()
            .iter()
            .map(|c| c.display_line())
            .collect()
    }
}

#[async_trait]
impl StepRunner for RecordingRunner {
    async fn run(&self, command: &StepCommand) -> BakeResult<CommandOutput> {
        self.commands.lock().push(command.clone());
        let line = command.display_line();
        if let Some(marker) = &self.fail_marker {
            if line.contains(marker.as_str()) {
                return Ok(CommandOutput {
                    status: 1,
                    stdout: String::new(),
                    stderr: format!("simulated failure for: {line}"),
                });
            }
        }
        Ok(CommandOutput {
            status: 0,
            stdout: format!("ran: {line}"),
            stderr: String::new(),
        })
    }
}
