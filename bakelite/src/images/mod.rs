//! Image records and the image manager.
//!
//! An image is an ordered chain of layer keys plus the runtime config the
//! launcher needs. Records follow the Podman-style split the rest of the
//! crate uses: metadata is persisted database-first, snapshot content lives
//! in the content-addressed store and is shared between images that agree on
//! a layer prefix.

mod base;
mod config;
mod reference;
mod store;

pub use base::{BaseImage, BaseProvider, RegistryBaseProvider};
pub use config::ImageConfig;
pub use reference::ImageRef;
pub use store::{LayerKey, SnapshotStore};

use crate::db::ImageStore;
use crate::errors::{BakeError, BakeResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique image identifier (ULID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(String);

impl ImageId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One committed pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerRecord {
    pub key: LayerKey,
    /// Instruction text the layer was produced by (for `images` output and
    /// debugging; the cache key is derived separately).
    pub instruction: String,
    /// Whether the layer was restored from the store instead of executed.
    pub cached: bool,
    pub duration_ms: u64,
}

/// A built image: identity, layer chain, and launch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: ImageId,
    pub reference: ImageRef,
    /// Digest of the full layer chain (`sha256:` + head layer key).
    pub digest: String,
    /// Digest of the acquired base, as resolved at build time.
    pub base_digest: String,
    pub config: ImageConfig,
    pub layers: Vec<LayerRecord>,
    pub created_at: DateTime<Utc>,
}

impl ImageRecord {
    /// Key of the head snapshot, i.e. the complete image rootfs.
    pub fn head_key(&self) -> Option<&LayerKey> {
        self.layers.last().map(|layer| &layer.key)
    }
}

/// Thread-safe access to built images.
///
/// Owns the metadata store and the snapshot store. All mutations are
/// database-first; snapshot content is only removed together with the
/// record that owns its head.
#[derive(Clone)]
pub struct ImageManager {
    store: ImageStore,
    snapshots: SnapshotStore,
}

impl ImageManager {
    pub fn new(store: ImageStore, snapshots: SnapshotStore) -> Self {
        Self { store, snapshots }
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Register a built image. Re-registering a reference replaces the
    /// previous record (retag), leaving its snapshots in the shared cache.
    pub fn register(&self, record: &ImageRecord) -> BakeResult<()> {
        self.store.save(record)?;
        tracing::info!(
            image_id = %record.id.short(),
            reference = %record.reference,
            digest = %record.digest,
            "Registered image"
        );
        Ok(())
    }

    pub fn get(&self, reference: &ImageRef) -> BakeResult<Option<ImageRecord>> {
        self.store.get_by_reference(reference)
    }

    pub fn list(&self) -> BakeResult<Vec<ImageRecord>> {
        self.store.list()
    }

    /// Remove an image record.
    ///
    /// Snapshots stay in the store: they double as the build cache for other
    /// images sharing a layer prefix. `remove` only severs the name.
    pub fn remove(&self, reference: &ImageRef) -> BakeResult<ImageRecord> {
        let record = self
            .store
            .get_by_reference(reference)?
            .ok_or_else(|| BakeError::NotFound(reference.to_string()))?;
        self.store.remove(reference)?;
        tracing::info!(reference = %reference, "Removed image record");
        Ok(record)
    }
}
