//! Bakelite: a minimal layered image builder and launcher.
//!
//! Bakelite executes one fixed, strictly linear build pipeline (acquire a
//! pinned base environment, set the working root, materialize the build
//! context, upgrade the package manager, install the dependency manifest,
//! register the entry command) and commits one content-addressed snapshot
//! per step. Unchanged inputs reproduce the identical layer chain; a failed
//! step aborts the build with no retries and no partial image.
//!
//! ```ignore
//! let runtime = BakeliteRuntime::new(RuntimeOptions::default())?;
//! let record = runtime
//!     .build(BuildRequest::new("/path/to/project", "myapp:latest"))
//!     .await?;
//! let exit = runtime.launch("myapp:latest").await?;
//! ```

pub mod build;
pub mod db;
pub mod errors;
pub mod exec;
pub mod images;
pub mod manifest;
pub mod pipeline;
pub mod runtime;

mod launch;
mod util;

pub use build::{BuildPhase, BuildRequest};
pub use errors::{BakeError, BakeResult};
pub use exec::{CommandOutput, HostRunner, StepCommand, StepRunner};
pub use images::{
    BaseImage, BaseProvider, ImageConfig, ImageId, ImageRecord, ImageRef, LayerKey, LayerRecord,
    RegistryBaseProvider,
};
pub use manifest::{Dependency, DependencyManifest};
pub use runtime::{BakeliteRuntime, BuildOptions, RuntimeOptions};

use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter env var; falls back to `info`.
const LOG_ENV: &str = "BAKELITE_LOG";

/// Initialize logging for a store home: human-readable output on stderr
/// plus a rolling file under `<home>/logs/`.
///
/// Returns the appender guard; hold it for the process lifetime so buffered
/// lines flush on exit. Returns `None` when a global subscriber is already
/// installed (tests, embedders).
pub fn init_logging_for(
    logs_dir: &Path,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let _ = std::fs::create_dir_all(logs_dir);
    let file_appender = tracing_appender::rolling::daily(logs_dir, "bakelite.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .try_init()
        .is_ok();

    installed.then_some(guard)
}
