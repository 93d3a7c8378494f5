//! User-facing configuration.
//!
//! Two layers, mirroring the config/state split used elsewhere:
//! `RuntimeOptions` configures the store itself, `BuildOptions` parametrizes
//! one build and is preserved verbatim in nothing but the layer
//! fingerprints it feeds.

use super::constants;
use crate::errors::{BakeError, BakeResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Store-level options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeOptions {
    /// Store root. Everything bakelite persists lives below this directory.
    pub home_dir: PathBuf,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        let home_dir = std::env::var_os(constants::HOME_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(std::env::temp_dir)
                    .join(constants::DEFAULT_HOME_DIR)
            });
        Self { home_dir }
    }
}

impl RuntimeOptions {
    pub fn with_home(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
        }
    }

    pub fn sanitize(&self) -> BakeResult<()> {
        if !self.home_dir.is_absolute() {
            return Err(BakeError::Config(format!(
                "store home must be an absolute path: {}",
                self.home_dir.display()
            )));
        }
        Ok(())
    }
}

/// Per-build options.
///
/// All fields have defaults matching the conventional single-process Python
/// app layout; `None` command overrides fall back to the package-manager
/// defaults derived from the manifest name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Pinned base reference.
    pub base: String,
    /// Absolute in-image working directory.
    pub workdir: String,
    /// Dependency manifest filename, relative to the workdir.
    pub manifest: String,
    /// Override for the package-manager self-upgrade command.
    pub upgrade_cmd: Option<Vec<String>>,
    /// Override for the dependency install command.
    pub install_cmd: Option<Vec<String>>,
    /// Entry command registered in the image config.
    pub entry_cmd: Vec<String>,
    /// Extra environment for build commands and the image config,
    /// `KEY=VALUE`.
    pub env: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            base: constants::DEFAULT_BASE_REFERENCE.to_string(),
            workdir: constants::DEFAULT_WORKDIR.to_string(),
            manifest: constants::DEFAULT_MANIFEST.to_string(),
            upgrade_cmd: None,
            install_cmd: None,
            entry_cmd: constants::default_entry_command(),
            env: Vec::new(),
        }
    }
}

impl BuildOptions {
    /// Effective self-upgrade command.
    pub fn upgrade_command(&self) -> Vec<String> {
        self.upgrade_cmd
            .clone()
            .unwrap_or_else(constants::default_upgrade_command)
    }

    /// Effective install command.
    pub fn install_command(&self) -> Vec<String> {
        self.install_cmd
            .clone()
            .unwrap_or_else(|| constants::default_install_command(&self.manifest))
    }

    /// Validate Early: reject inconsistent options before any store work.
    pub fn sanitize(&self) -> BakeResult<()> {
        if self.base.trim().is_empty() {
            return Err(BakeError::Config("base reference must not be empty".into()));
        }
        if !self.workdir.starts_with('/') {
            return Err(BakeError::Config(format!(
                "workdir must be absolute: {:?}",
                self.workdir
            )));
        }
        if self.manifest.trim().is_empty() || self.manifest.contains('/') {
            return Err(BakeError::Config(format!(
                "manifest must be a bare filename: {:?}",
                self.manifest
            )));
        }
        if self.entry_cmd.is_empty() {
            return Err(BakeError::Config("entry command must not be empty".into()));
        }
        for cmd in [&self.upgrade_cmd, &self.install_cmd].into_iter().flatten() {
            if cmd.is_empty() {
                return Err(BakeError::Config("command override must not be empty".into()));
            }
        }
        for entry in &self.env {
            if !entry.contains('=') {
                return Err(BakeError::Config(format!(
                    "environment entries must be KEY=VALUE: {:?}",
                    entry
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let opts = BuildOptions::default();
        opts.sanitize().unwrap();
        assert_eq!(opts.base, "python:3.11");
        assert_eq!(opts.workdir, "/app");
        assert_eq!(opts.entry_cmd, vec!["python", "main.py"]);
        assert_eq!(
            opts.install_command(),
            vec!["python", "-m", "pip", "install", "-r", "requirements.txt"]
        );
        assert_eq!(
            opts.upgrade_command(),
            vec!["python", "-m", "pip", "install", "--upgrade", "pip"]
        );
    }

    #[test]
    fn test_install_command_follows_manifest_name() {
        let opts = BuildOptions {
            manifest: "deps.txt".into(),
            ..Default::default()
        };
        assert_eq!(opts.install_command()[5], "deps.txt");
    }

    #[test]
    fn test_sanitize_rejects_relative_workdir() {
        let opts = BuildOptions {
            workdir: "app".into(),
            ..Default::default()
        };
        assert!(matches!(opts.sanitize(), Err(BakeError::Config(_))));
    }

    #[test]
    fn test_sanitize_rejects_bad_env_entry() {
        let opts = BuildOptions {
            env: vec!["NO_VALUE".into()],
            ..Default::default()
        };
        assert!(opts.sanitize().is_err());
    }

    #[test]
    fn test_runtime_options_require_absolute_home() {
        assert!(RuntimeOptions::with_home("relative/home").sanitize().is_err());
        assert!(RuntimeOptions::with_home("/tmp/store").sanitize().is_ok());
    }
}
