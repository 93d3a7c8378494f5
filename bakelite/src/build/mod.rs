//! Build orchestration.
//!
//! ## Architecture
//!
//! A build is one table-driven pipeline run over a shared context:
//!
//! ```text
//! 1. AcquireBase    (resolve pinned base, seed rootfs)
//! 2. Workdir        (record + create working root)
//! 3. CopySources    (materialize build context)
//! 4. PkgUpgrade     (package manager self-upgrade)
//! 5. InstallDeps    (manifest check + install command)
//! 6. Entrypoint     (register entry command)
//! ```
//!
//! Every step commits one snapshot; a failed step aborts the run and the
//! workspace temp dir drops its uncommitted work. Only a pipeline that
//! reaches the terminal phase registers an image record.

mod steps;
mod types;

pub use types::{BuildPhase, BuildRequest};
pub(crate) use types::{BuildCtx, BuildPipelineContext};

use crate::errors::{BakeError, BakeResult};
use crate::images::{ImageConfig, ImageId, ImageRecord, ImageRef};
use crate::pipeline::{BoxedStep, ExecutionPlan, PipelineBuilder, PipelineExecutor, PipelineMetrics};
use crate::runtime::RuntimeInner;
use chrono::Utc;
use std::sync::Arc;
use steps::{
    AcquireBaseStep, CopySourcesStep, EntrypointStep, InstallDepsStep, PkgUpgradeStep, WorkdirStep,
};
use tokio::sync::Mutex;

/// The fixed execution plan. One step per phase, in phase order.
fn execution_plan() -> ExecutionPlan<BuildCtx> {
    let steps: Vec<BoxedStep<BuildCtx>> = vec![
        Box::new(AcquireBaseStep),
        Box::new(WorkdirStep),
        Box::new(CopySourcesStep),
        Box::new(PkgUpgradeStep),
        Box::new(InstallDepsStep),
        Box::new(EntrypointStep),
    ];
    ExecutionPlan::new(steps)
}

/// Builds an image from a request.
///
/// # Example
///
/// ```ignore
/// let record = ImageBuilder::new(runtime, request)?.build().await?;
/// ```
pub(crate) struct ImageBuilder {
    runtime: RuntimeInner,
    request: BuildRequest,
}

impl ImageBuilder {
    /// Validate Early: reject bad options before any store work.
    pub(crate) fn new(runtime: RuntimeInner, request: BuildRequest) -> BakeResult<Self> {
        request.options.sanitize()?;
        Ok(Self { runtime, request })
    }

    /// Run the pipeline and register the resulting image.
    pub(crate) async fn build(self) -> BakeResult<ImageRecord> {
        let ImageBuilder { runtime, request } = self;

        let image_ref = ImageRef::parse(&request.reference)?;
        if !request.context_dir.is_dir() {
            return Err(BakeError::Context(format!(
                "build context is not a directory: {}",
                request.context_dir.display()
            )));
        }

        let image_id = ImageId::new();
        tracing::info!(
            image_id = %image_id.short(),
            reference = %image_ref,
            context = %request.context_dir.display(),
            "Starting build"
        );

        // Workspace lives in the store's tmp dir (same filesystem as the
        // snapshot store, so commits can hardlink). Dropped on any exit
        // path, taking uncommitted step output with it.
        let workspace = tempfile::tempdir_in(runtime.layout.tmp_dir())
            .map_err(|e| BakeError::Storage(format!("failed to create build workspace: {}", e)))?;
        let rootfs = workspace.path().join("rootfs");
        std::fs::create_dir_all(&rootfs)?;

        let ctx: BuildCtx = Arc::new(Mutex::new(BuildPipelineContext {
            request,
            image_ref: image_ref.clone(),
            image_id: image_id.clone(),
            runtime: Arc::clone(&runtime),
            rootfs,
            phase: None,
            head: None,
            layers: Vec::new(),
            config: ImageConfig::default(),
            base: None,
        }));

        let pipeline = PipelineBuilder::from_plan(execution_plan());
        let metrics = PipelineExecutor::execute(pipeline, Arc::clone(&ctx)).await?;

        let ctx = ctx.lock().await;
        if ctx.phase != Some(BuildPhase::TERMINAL) {
            return Err(BakeError::Internal(format!(
                "pipeline finished in non-terminal phase {:?}",
                ctx.phase.map(|p| p.label())
            )));
        }
        let head = ctx
            .head
            .clone()
            .ok_or_else(|| BakeError::Internal("pipeline committed no layers".into()))?;
        let base = ctx
            .base
            .as_ref()
            .ok_or_else(|| BakeError::Internal("acquire_base step must run first".into()))?;

        let record = ImageRecord {
            id: image_id,
            reference: image_ref,
            digest: format!("sha256:{}", head.as_hex()),
            base_digest: base.digest.clone(),
            config: ctx.config.clone(),
            layers: ctx.layers.clone(),
            created_at: Utc::now(),
        };
        runtime.images.register(&record)?;

        log_build_summary(&record, &metrics);
        Ok(record)
    }
}

fn log_build_summary(record: &ImageRecord, metrics: &PipelineMetrics) {
    for layer in &record.layers {
        tracing::info!(
            image_id = %record.id.short(),
            instruction = %layer.instruction,
            key = %layer.key.short(),
            cached = layer.cached,
            duration_ms = layer.duration_ms,
            "Build step finished"
        );
    }
    tracing::info!(
        image_id = %record.id.short(),
        reference = %record.reference,
        digest = %record.digest,
        total_duration_ms = metrics.total_duration_ms as u64,
        "Build complete"
    );
}
