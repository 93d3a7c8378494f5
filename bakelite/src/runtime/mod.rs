//! High-level runtime: store ownership plus the build/launch entry points.

pub mod constants;
pub mod layout;
mod lock;
pub mod options;

pub use options::{BuildOptions, RuntimeOptions};

use crate::build::{BuildRequest, ImageBuilder};
use crate::db::{Database, ImageStore};
use crate::errors::BakeResult;
use crate::exec::{HostRunner, StepRunner};
use crate::images::{BaseProvider, ImageManager, ImageRecord, ImageRef, RegistryBaseProvider, SnapshotStore};
use crate::launch;
use layout::FilesystemLayout;
use lock::RuntimeLock;
use std::sync::Arc;

/// BakeliteRuntime is the main entry point for building and launching
/// images.
///
/// **Lock Behavior**: Only one runtime can use a given `BAKELITE_HOME`
/// directory at a time. The filesystem lock is released when dropped.
///
/// **Cloning**: Cheap via `Arc`; all clones share the same state.
#[derive(Clone)]
pub struct BakeliteRuntime {
    inner: RuntimeInner,
}

/// Shared internal runtime state.
pub(crate) type RuntimeInner = Arc<RuntimeInnerImpl>;

pub(crate) struct RuntimeInnerImpl {
    /// Store layout (immutable after init).
    pub(crate) layout: FilesystemLayout,
    /// Image metadata + snapshot stores (internally synchronized).
    pub(crate) images: ImageManager,
    /// Executes package-manager step commands.
    pub(crate) runner: Arc<dyn StepRunner>,
    /// Resolves pinned base references.
    pub(crate) base_provider: Arc<dyn BaseProvider>,

    /// Held for the runtime's lifetime; prevents a second process from
    /// mutating the same store.
    _runtime_lock: RuntimeLock,
}

impl BakeliteRuntime {
    /// Create a runtime with the default backends (host command execution,
    /// registry base pulls).
    ///
    /// **Prepare Before Execute**: layout, lock and database are all set up
    /// before returning; there are no partially initialized runtimes.
    pub fn new(options: RuntimeOptions) -> BakeResult<Self> {
        Self::with_backends(
            options,
            Arc::new(HostRunner),
            Arc::new(RegistryBaseProvider::new()),
        )
    }

    /// Create a runtime with explicit backends. This is the seam tests and
    /// embedders use to swap command execution or base acquisition.
    pub fn with_backends(
        options: RuntimeOptions,
        runner: Arc<dyn StepRunner>,
        base_provider: Arc<dyn BaseProvider>,
    ) -> BakeResult<Self> {
        options.sanitize()?;

        let layout = FilesystemLayout::new(&options.home_dir);
        layout.init()?;

        let runtime_lock = RuntimeLock::acquire(&layout.lock_path())?;

        let db = Database::open(&layout.db_path())?;
        let snapshots = SnapshotStore::open(&layout.snapshots_dir())?;
        let images = ImageManager::new(ImageStore::new(db), snapshots);

        tracing::debug!(home = %layout.home_dir().display(), "Runtime initialized");

        Ok(Self {
            inner: Arc::new(RuntimeInnerImpl {
                layout,
                images,
                runner,
                base_provider,
                _runtime_lock: runtime_lock,
            }),
        })
    }

    /// Run the build pipeline for `request` and register the resulting
    /// image under the request's reference.
    pub async fn build(&self, request: BuildRequest) -> BakeResult<ImageRecord> {
        ImageBuilder::new(Arc::clone(&self.inner), request)?.build().await
    }

    /// Launch an image's entry command and wait for it to finish.
    ///
    /// Returns the process exit code, which is by contract the container's
    /// exit code.
    pub async fn launch(&self, reference: &str) -> BakeResult<i32> {
        launch::launch_image(&self.inner, reference).await
    }

    /// All registered images, newest first.
    pub fn images(&self) -> BakeResult<Vec<ImageRecord>> {
        self.inner.images.list()
    }

    /// Look up a single image.
    pub fn image(&self, reference: &str) -> BakeResult<Option<ImageRecord>> {
        self.inner.images.get(&ImageRef::parse(reference)?)
    }

    /// Remove an image record by reference.
    pub fn remove_image(&self, reference: &str) -> BakeResult<ImageRecord> {
        self.inner.images.remove(&ImageRef::parse(reference)?)
    }

    /// Store home this runtime owns.
    pub fn home_dir(&self) -> &std::path::Path {
        self.inner.layout.home_dir()
    }
}

impl std::fmt::Debug for BakeliteRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BakeliteRuntime")
            .field("home", &self.inner.layout.home_dir())
            .finish()
    }
}
