//! Manifest persistence
//!
//! Key space per document id `D` (behind the configurable namespace):
//! - `doc:<D>:manifest`: full manifest JSON
//! - `doc:<D>:meta`: exactly `manifest.meta`, projected for cheap reads
//! - `doc:<D>:assets`: set of bare hashes referenced by the manifest
//! - `doc:<D>:thumb`: thumbnail bytes
//!
//! A save stamps `meta.updatedAt`, walks the manifest for its references
//! (the same traversal the converter uses) and commits manifest, meta
//! projection and asset set in one atomic batch: a concurrent reader sees
//! the prior document or the new one, never a mixture.

use std::collections::BTreeSet;
use std::sync::Arc;

use dv_domain::{collect_reference_hashes, DeckMeta, DomainError, Manifest};
use dv_ports::{Clock, KeyValueStore, KvError, KvWrite};
use tracing::{debug, instrument};

use crate::metrics::StoreMetrics;

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("corrupt stored document {id}: {message}")]
    CorruptData { id: String, message: String },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<KvError> for RepositoryError {
    fn from(err: KvError) -> Self {
        RepositoryError::Storage {
            message: err.to_string(),
        }
    }
}

/// Manifest/metadata/asset-set/thumbnail persistence for one namespace.
pub struct DocRepository<S: KeyValueStore> {
    kv: Arc<S>,
    namespace: String,
    clock: Arc<dyn Clock>,
    metrics: Arc<StoreMetrics>,
}

impl<S: KeyValueStore> DocRepository<S> {
    pub fn new(
        kv: Arc<S>,
        namespace: impl Into<String>,
        clock: Arc<dyn Clock>,
        metrics: Arc<StoreMetrics>,
    ) -> Self {
        Self {
            kv,
            namespace: namespace.into(),
            clock,
            metrics,
        }
    }

    pub fn manifest_key(&self, id: &str) -> String {
        format!("{}doc:{}:manifest", self.namespace, id)
    }

    pub fn meta_key(&self, id: &str) -> String {
        format!("{}doc:{}:meta", self.namespace, id)
    }

    pub fn assets_key(&self, id: &str) -> String {
        format!("{}doc:{}:assets", self.namespace, id)
    }

    pub fn thumb_key(&self, id: &str) -> String {
        format!("{}doc:{}:thumb", self.namespace, id)
    }

    /// SCAN pattern matching every metadata projection in this namespace.
    pub fn meta_scan_pattern(&self) -> String {
        format!("{}doc:*:meta", self.namespace)
    }

    /// SCAN pattern matching every manifest in this namespace.
    pub fn manifest_scan_pattern(&self) -> String {
        format!("{}doc:*:manifest", self.namespace)
    }

    /// Document id embedded in a key produced by [`Self::manifest_key`].
    pub fn id_from_manifest_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(&self.namespace)?
            .strip_prefix("doc:")?
            .strip_suffix(":manifest")
    }

    /// Stamp `updatedAt`, project metadata and the asset set, and commit
    /// all of it atomically.
    #[instrument(skip(self, manifest))]
    pub async fn save_manifest(
        &self,
        id: &str,
        manifest: &mut Manifest,
    ) -> Result<(), RepositoryError> {
        manifest.meta.updated_at = Some(self.clock.now_ms());

        let hashes: BTreeSet<String> = collect_reference_hashes(manifest)?;
        let manifest_json =
            serde_json::to_string(manifest).map_err(|e| RepositoryError::Storage {
                message: format!("failed to serialize manifest: {e}"),
            })?;
        let meta_json =
            serde_json::to_string(&manifest.meta).map_err(|e| RepositoryError::Storage {
                message: format!("failed to serialize meta: {e}"),
            })?;

        self.kv
            .apply(vec![
                KvWrite::PutString {
                    key: self.manifest_key(id),
                    value: manifest_json,
                },
                KvWrite::PutDocument {
                    key: self.meta_key(id),
                    json: meta_json,
                },
                KvWrite::ReplaceSet {
                    key: self.assets_key(id),
                    members: hashes.into_iter().collect(),
                },
            ])
            .await?;

        StoreMetrics::incr(&self.metrics.manifest_saves);
        debug!(id, "manifest saved");
        Ok(())
    }

    pub async fn get_manifest(&self, id: &str) -> Result<Option<Manifest>, RepositoryError> {
        StoreMetrics::incr(&self.metrics.manifest_reads);
        let Some(json) = self.kv.get_string(&self.manifest_key(id)).await? else {
            return Ok(None);
        };
        let manifest = serde_json::from_str(&json).map_err(|e| RepositoryError::CorruptData {
            id: id.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(manifest))
    }

    pub async fn get_meta(&self, id: &str) -> Result<Option<DeckMeta>, RepositoryError> {
        StoreMetrics::incr(&self.metrics.meta_reads);
        let Some(json) = self.kv.get_document(&self.meta_key(id)).await? else {
            return Ok(None);
        };
        let meta = serde_json::from_str(&json).map_err(|e| RepositoryError::CorruptData {
            id: id.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(meta))
    }

    pub async fn exists(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(self.kv.exists(&self.manifest_key(id)).await?)
    }

    /// Remove manifest, metadata, asset set and thumbnail in one round
    /// trip. Returns true when anything was removed. Asset blobs are never
    /// touched here.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let removed = self
            .kv
            .delete(&[
                self.manifest_key(id),
                self.meta_key(id),
                self.assets_key(id),
                self.thumb_key(id),
            ])
            .await?;
        StoreMetrics::incr(&self.metrics.deletes);
        Ok(removed > 0)
    }

    /// The stored asset-hash set for a document.
    pub async fn get_assets(&self, id: &str) -> Result<BTreeSet<String>, RepositoryError> {
        Ok(self
            .kv
            .set_members(&self.assets_key(id))
            .await?
            .into_iter()
            .collect())
    }

    pub async fn save_thumbnail(&self, id: &str, bytes: Vec<u8>) -> Result<(), RepositoryError> {
        self.kv
            .apply(vec![KvWrite::PutBytes {
                key: self.thumb_key(id),
                value: bytes,
            }])
            .await?;
        Ok(())
    }

    pub async fn get_thumbnail(&self, id: &str) -> Result<Option<Vec<u8>>, RepositoryError> {
        Ok(self.kv.get_bytes(&self.thumb_key(id)).await?)
    }
}
