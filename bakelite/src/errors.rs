//! Error types shared across the crate.

use thiserror::Error;

/// Crate-wide error type.
///
/// Build failures map onto the step that produced them: base acquisition,
/// context materialization, manifest/dependency handling, or launch. All
/// build errors abort the pipeline immediately; there are no retries.
#[derive(Error, Debug)]
pub enum BakeError {
    /// Base environment acquisition failed (unreachable registry, bad tag,
    /// corrupt layer blob).
    #[error("base image error: {0}")]
    BaseImage(String),

    /// Build context could not be materialized (missing directory,
    /// unreadable file).
    #[error("build context error: {0}")]
    Context(String),

    /// Dependency manifest is missing or unreadable.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// Dependency installation command failed.
    #[error("dependency install error: {0}")]
    Deps(String),

    /// Entry command could not be launched.
    #[error("launch error: {0}")]
    Launch(String),

    /// Invalid user-supplied configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Store or snapshot operation failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Metadata database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Named image or resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation attempted in a phase that does not allow it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Invariant violation inside the crate.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BakeResult<T> = std::result::Result<T, BakeError>;
