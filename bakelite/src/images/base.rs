//! Base environment acquisition.
//!
//! The first pipeline step resolves a pinned base reference into an unpacked
//! rootfs plus its OCI config. `RegistryBaseProvider` pulls from a registry
//! and caches the unpacked result under the store's `bases/` directory, so
//! repeat builds of the same pinned tag never touch the network.
//!
//! The provider is a trait so tests can substitute a local fixture.

use crate::errors::{BakeError, BakeResult};
use crate::images::ImageConfig;
use crate::util::digest::sha256_hex;
use crate::util::fs::{clear_dir, remove_tree_if_exists};
use async_trait::async_trait;
use oci_client::client::{ClientConfig, linux_amd64_resolver};
use oci_client::manifest::{IMAGE_DOCKER_LAYER_GZIP_MEDIA_TYPE, IMAGE_LAYER_GZIP_MEDIA_TYPE};
use oci_client::secrets::RegistryAuth;
use oci_client::{Client, Reference};
use std::path::{Path, PathBuf};

/// An acquired base environment, ready to seed a build rootfs.
#[derive(Debug, Clone)]
pub struct BaseImage {
    /// Reference the base was resolved from.
    pub reference: String,
    /// Content digest identifying the resolved base (cache-busts downstream
    /// layers when the pinned tag moves).
    pub digest: String,
    /// Unpacked merged rootfs, owned by the base cache.
    pub rootfs_dir: PathBuf,
    /// Environment/command defaults declared by the base.
    pub config: ImageConfig,
}

/// Source of base environments.
#[async_trait]
pub trait BaseProvider: Send + Sync {
    /// Resolve `reference` into an unpacked base, using `cache_dir` for
    /// reuse across builds.
    async fn acquire(&self, reference: &str, cache_dir: &Path) -> BakeResult<BaseImage>;
}

/// Registry-backed provider.
///
/// Pulls manifest + layers anonymously, verifies layer digests against the
/// manifest descriptors, and unpacks gzipped tarballs in order (whiteout
/// entries applied) into a cache entry keyed by the reference string.
pub struct RegistryBaseProvider {
    client: Client,
}

impl RegistryBaseProvider {
    pub fn new() -> Self {
        let config = ClientConfig {
            platform_resolver: Some(Box::new(linux_amd64_resolver)),
            ..Default::default()
        };
        Self {
            client: Client::new(config),
        }
    }
}

impl Default for RegistryBaseProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseProvider for RegistryBaseProvider {
    async fn acquire(&self, reference: &str, cache_dir: &Path) -> BakeResult<BaseImage> {
        std::fs::create_dir_all(cache_dir)?;
        let entry_dir = cache_dir.join(sha256_hex(reference.as_bytes()));

        // A digest marker is written last; its presence means the entry is
        // complete and can be reused without touching the registry.
        if let Some(base) = load_cached(reference, &entry_dir)? {
            tracing::info!(reference, digest = %base.digest, "Reusing cached base");
            return Ok(base);
        }

        let parsed = Reference::try_from(reference)
            .map_err(|e| BakeError::BaseImage(format!("invalid base reference {reference:?}: {e}")))?;

        tracing::info!(reference, "Pulling base image");
        let image = self
            .client
            .pull(
                &parsed,
                &RegistryAuth::Anonymous,
                vec![IMAGE_DOCKER_LAYER_GZIP_MEDIA_TYPE, IMAGE_LAYER_GZIP_MEDIA_TYPE],
            )
            .await
            .map_err(|e| BakeError::BaseImage(format!("failed to pull {reference}: {e}")))?;

        verify_layer_digests(&image)?;

        let oci_config: oci_spec::image::ImageConfiguration =
            serde_json::from_slice(&image.config.data).map_err(|e| {
                BakeError::BaseImage(format!("invalid image config for {reference}: {e}"))
            })?;
        let config = ImageConfig::from_oci_config(&oci_config);

        let digest = image
            .digest
            .clone()
            .unwrap_or_else(|| format!("sha256:{}", sha256_hex(&image.config.data)));

        // Unpack into the entry, then write metadata markers
        remove_tree_if_exists(&entry_dir)?;
        let rootfs_dir = entry_dir.join("rootfs");
        std::fs::create_dir_all(&rootfs_dir)?;

        let layers: Vec<Vec<u8>> = image.layers.into_iter().map(|l| l.data).collect();
        let unpack_root = rootfs_dir.clone();
        let layer_count = layers.len();
        tokio::task::spawn_blocking(move || -> BakeResult<()> {
            for blob in &layers {
                unpack_layer(blob, &unpack_root)?;
            }
            Ok(())
        })
        .await
        .map_err(|e| BakeError::Internal(format!("unpack task failed: {}", e)))??;

        std::fs::write(
            entry_dir.join("config.json"),
            serde_json::to_vec_pretty(&config)
                .map_err(|e| BakeError::Internal(format!("config serialization: {}", e)))?,
        )?;
        std::fs::write(entry_dir.join("digest"), &digest)?;

        tracing::info!(reference, digest = %digest, layer_count, "Unpacked base image");

        Ok(BaseImage {
            reference: reference.to_string(),
            digest,
            rootfs_dir,
            config,
        })
    }
}

fn load_cached(reference: &str, entry_dir: &Path) -> BakeResult<Option<BaseImage>> {
    let digest_path = entry_dir.join("digest");
    if !digest_path.is_file() {
        return Ok(None);
    }
    let digest = std::fs::read_to_string(&digest_path)?;
    let config: ImageConfig = serde_json::from_slice(&std::fs::read(entry_dir.join("config.json"))?)
        .map_err(|e| BakeError::Storage(format!("corrupt base cache entry: {}", e)))?;
    Ok(Some(BaseImage {
        reference: reference.to_string(),
        digest: digest.trim().to_string(),
        rootfs_dir: entry_dir.join("rootfs"),
        config,
    }))
}

/// Compare pulled blob digests against the manifest descriptors.
fn verify_layer_digests(image: &oci_client::client::ImageData) -> BakeResult<()> {
    let Some(manifest) = &image.manifest else {
        return Ok(());
    };
    for (descriptor, layer) in manifest.layers.iter().zip(&image.layers) {
        let actual = format!("sha256:{}", sha256_hex(&layer.data));
        if descriptor.digest != actual {
            return Err(BakeError::BaseImage(format!(
                "layer digest mismatch: manifest {} but blob is {}",
                descriptor.digest, actual
            )));
        }
    }
    Ok(())
}

/// Unpack a single (possibly gzipped) tar layer into `dest`.
///
/// OCI whiteout entries are applied instead of extracted:
/// `.wh..wh..opq` clears the directory it appears in, `.wh.<name>` removes
/// `<name>` from the tree built up by earlier layers.
fn unpack_layer(blob: &[u8], dest: &Path) -> BakeResult<()> {
    // Layer media types in the wild are occasionally mislabeled; sniff the
    // gzip magic instead of trusting the manifest.
    let gzipped = blob.len() >= 2 && blob[0] == 0x1f && blob[1] == 0x8b;
    if gzipped {
        unpack_tar(flate2::read::GzDecoder::new(blob), dest)
    } else {
        unpack_tar(blob, dest)
    }
}

fn unpack_tar<R: std::io::Read>(reader: R, dest: &Path) -> BakeResult<()> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_unpack_xattrs(false);

    for entry in archive
        .entries()
        .map_err(|e| BakeError::BaseImage(format!("corrupt layer archive: {}", e)))?
    {
        let mut entry =
            entry.map_err(|e| BakeError::BaseImage(format!("corrupt layer entry: {}", e)))?;
        let path = entry
            .path()
            .map_err(|e| BakeError::BaseImage(format!("bad layer path: {}", e)))?
            .into_owned();

        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name == ".wh..wh..opq" {
            let dir = path.parent().map(|p| dest.join(p)).unwrap_or_else(|| dest.to_path_buf());
            if dir.starts_with(dest) {
                clear_dir(&dir)?;
            }
            continue;
        }
        if let Some(hidden) = name.strip_prefix(".wh.") {
            let target = path
                .parent()
                .map(|p| dest.join(p).join(hidden))
                .unwrap_or_else(|| dest.join(hidden));
            if target.starts_with(dest) {
                crate::util::fs::remove_tree_if_exists(&target).or_else(|_| {
                    std::fs::remove_file(&target).map_err(BakeError::from)
                })?;
            }
            continue;
        }

        // unpack_in refuses entries that escape dest
        entry
            .unpack_in(dest)
            .map_err(|e| BakeError::BaseImage(format!("failed to unpack {}: {}", path.display(), e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(flate2::write::GzEncoder::new(
            Vec::new(),
            flate2::Compression::default(),
        ));
        for (path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_unpack_layer_extracts_files() {
        let tmp = tempfile::tempdir().unwrap();
        let blob = tar_gz(&[("app/main.py", b"print('ok')")]);
        unpack_layer(&blob, tmp.path()).unwrap();
        assert_eq!(
            std::fs::read(tmp.path().join("app/main.py")).unwrap(),
            b"print('ok')"
        );
    }

    #[test]
    fn test_unpack_layer_applies_whiteout() {
        let tmp = tempfile::tempdir().unwrap();
        unpack_layer(&tar_gz(&[("etc/old.conf", b"v1")]), tmp.path()).unwrap();
        unpack_layer(&tar_gz(&[("etc/.wh.old.conf", b"")]), tmp.path()).unwrap();
        assert!(!tmp.path().join("etc/old.conf").exists());
    }

    #[test]
    fn test_unpack_layer_handles_plain_tar() {
        let tmp = tempfile::tempdir().unwrap();
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(2);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "f", &b"ok"[..]).unwrap();
        let blob = builder.into_inner().unwrap();

        unpack_layer(&blob, tmp.path()).unwrap();
        assert_eq!(std::fs::read(tmp.path().join("f")).unwrap(), b"ok");
    }
}
