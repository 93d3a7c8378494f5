//! Type definitions for the build pipeline.

use crate::errors::{BakeError, BakeResult};
use crate::images::{BaseImage, ImageConfig, ImageId, ImageRef, LayerKey, LayerRecord};
use crate::runtime::BuildOptions;
use crate::runtime::RuntimeInner;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Build pipeline phases, in the only order they may occur.
///
/// Strictly linear: each phase is entered exactly once, by the step that
/// owns it, and only from its predecessor. The terminal phase marks a
/// runnable image; actually launching it is a separate runtime event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildPhase {
    BaseSelected,
    WorkdirSet,
    SourcesCopied,
    PkgManagerUpgraded,
    DepsInstalled,
    EntrypointSet,
}

impl BuildPhase {
    pub const FIRST: BuildPhase = BuildPhase::BaseSelected;
    pub const TERMINAL: BuildPhase = BuildPhase::EntrypointSet;

    /// Successor phase, or `None` for the terminal phase.
    pub fn next(self) -> Option<BuildPhase> {
        use BuildPhase::*;
        match self {
            BaseSelected => Some(WorkdirSet),
            WorkdirSet => Some(SourcesCopied),
            SourcesCopied => Some(PkgManagerUpgraded),
            PkgManagerUpgraded => Some(DepsInstalled),
            DepsInstalled => Some(EntrypointSet),
            EntrypointSet => None,
        }
    }

    pub fn label(&self) -> &'static str {
        use BuildPhase::*;
        match self {
            BaseSelected => "base_selected",
            WorkdirSet => "workdir_set",
            SourcesCopied => "sources_copied",
            PkgManagerUpgraded => "pkg_manager_upgraded",
            DepsInstalled => "deps_installed",
            EntrypointSet => "entrypoint_set",
        }
    }
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One build: context directory, target reference, options.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Build context: the project tree to materialize into the image.
    pub context_dir: PathBuf,
    /// Reference to register the result under, `name[:tag]`.
    pub reference: String,
    pub options: BuildOptions,
}

impl BuildRequest {
    pub fn new(context_dir: impl Into<PathBuf>, reference: impl Into<String>) -> Self {
        Self {
            context_dir: context_dir.into(),
            reference: reference.into(),
            options: BuildOptions::default(),
        }
    }
}

/// Shared mutable state for the build pipeline.
///
/// Steps take what they need under the lock, work without it, then write
/// their outputs back.
pub struct BuildPipelineContext {
    pub request: BuildRequest,
    pub image_ref: ImageRef,
    pub image_id: ImageId,
    pub runtime: RuntimeInner,

    /// Working rootfs inside the build workspace; mutated by steps and
    /// snapshotted after each one.
    pub rootfs: PathBuf,

    /// Phase reached so far. `None` until the first step commits.
    pub phase: Option<BuildPhase>,
    /// Head of the layer chain committed so far.
    pub head: Option<LayerKey>,
    pub layers: Vec<LayerRecord>,

    /// Image config accumulated across steps.
    pub config: ImageConfig,
    /// Base resolved by the first step.
    pub base: Option<BaseImage>,
}

pub(crate) type BuildCtx = Arc<Mutex<BuildPipelineContext>>;

impl BuildPipelineContext {
    /// Enter `phase`, enforcing the linear order.
    pub fn advance_to(&mut self, phase: BuildPhase) -> BakeResult<()> {
        let expected = match self.phase {
            None => Some(BuildPhase::FIRST),
            Some(current) => current.next(),
        };
        match expected {
            Some(expected) if expected == phase => {
                self.phase = Some(phase);
                Ok(())
            }
            _ => Err(BakeError::InvalidState(format!(
                "cannot enter phase {} from {}",
                phase,
                self.phase.map(|p| p.label()).unwrap_or("start"),
            ))),
        }
    }

    /// Absolute path of the image workdir inside the build rootfs.
    pub fn workdir_path(&self) -> PathBuf {
        self.rootfs
            .join(self.request.options.workdir.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_chain_is_linear_and_terminal() {
        let mut phase = BuildPhase::FIRST;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            seen.push(next);
            phase = next;
        }
        assert_eq!(phase, BuildPhase::TERMINAL);
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_phase_labels_are_unique() {
        let mut labels: Vec<&str> = Vec::new();
        let mut phase = Some(BuildPhase::FIRST);
        while let Some(p) = phase {
            labels.push(p.label());
            phase = p.next();
        }
        let mut deduped = labels.clone();
        deduped.dedup();
        assert_eq!(labels, deduped);
    }
}
