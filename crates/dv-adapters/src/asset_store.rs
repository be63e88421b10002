//! Content-addressed asset store
//!
//! Binary assets live at `asset:<hash>` with a JSON metadata sidecar at
//! `asset:<hash>:info`. Storing is idempotent: re-uploading the same bytes
//! returns the same hash without touching storage, and the first writer's
//! metadata stays (re-uploading with a different filename keeps the
//! original one).
//!
//! Both keys are written set-if-absent inside one atomic batch, which is
//! what makes `put` race-free under arbitrary concurrent callers without a
//! named lock.

use std::sync::Arc;

use dv_domain::{hash_bytes, AssetInfo, NewAssetInfo, DEFAULT_MIME_TYPE};
use dv_ports::{Clock, KeyValueStore, KvError, KvWrite};
use tracing::{debug, instrument};

use crate::metrics::StoreMetrics;

/// Asset store errors
#[derive(Debug, thiserror::Error)]
pub enum AssetStoreError {
    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("asset metadata at {hash} does not parse: {message}")]
    CorruptInfo { hash: String, message: String },
}

impl From<KvError> for AssetStoreError {
    fn from(err: KvError) -> Self {
        AssetStoreError::Storage {
            message: err.to_string(),
        }
    }
}

/// Content-addressed binary store with dedupe.
pub struct AssetStore<S: KeyValueStore> {
    kv: Arc<S>,
    namespace: String,
    clock: Arc<dyn Clock>,
    metrics: Arc<StoreMetrics>,
}

impl<S: KeyValueStore> AssetStore<S> {
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

    fn bytes_key(&self, hash: &str) -> String {
        format!("{}asset:{}", self.namespace, hash)
    }

    fn info_key(&self, hash: &str) -> String {
        format!("{}asset:{}:info", self.namespace, hash)
    }

    /// Store bytes, returning their hash. Deduplicates on content: the
    /// second store of the same bytes touches nothing and keeps the first
    /// writer's metadata.
    #[instrument(skip(self, bytes, info), fields(size = bytes.len()))]
    pub async fn put(&self, bytes: &[u8], info: NewAssetInfo) -> Result<String, AssetStoreError> {
        let hash = hash_bytes(bytes);
        let bytes_key = self.bytes_key(&hash);

        if self.kv.exists(&bytes_key).await? {
            StoreMetrics::incr(&self.metrics.asset_dedupe_hits);
            debug!(hash = %hash, "asset already stored, dedupe hit");
            return Ok(hash);
        }

        let record = AssetInfo {
            sha256: hash.clone(),
            byte_size: bytes.len() as u64,
            mime_type: info
                .mime_type
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            original_filename: info.original_filename,
            created_at: self.clock.now(),
            width: info.width,
            height: info.height,
        };
        let record_json = serde_json::to_string(&record).map_err(|e| AssetStoreError::Storage {
            message: format!("failed to serialize asset info: {e}"),
        })?;

        self.kv
            .apply(vec![
                KvWrite::PutBytesNx {
                    key: bytes_key,
                    value: bytes.to_vec(),
                },
                KvWrite::PutStringNx {
                    key: self.info_key(&hash),
                    value: record_json,
                },
            ])
            .await?;

        StoreMetrics::incr(&self.metrics.asset_puts);
        debug!(hash = %hash, size = bytes.len(), "asset stored");
        Ok(hash)
    }

    /// Raw bytes of an asset, `None` when absent.
    pub async fn get(&self, hash: &str) -> Result<Option<Vec<u8>>, AssetStoreError> {
        StoreMetrics::incr(&self.metrics.asset_reads);
        Ok(self.kv.get_bytes(&self.bytes_key(hash)).await?)
    }

    /// Metadata sidecar of an asset, `None` when absent.
    pub async fn info(&self, hash: &str) -> Result<Option<AssetInfo>, AssetStoreError> {
        let Some(json) = self.kv.get_string(&self.info_key(hash)).await? else {
            return Ok(None);
        };
        let info =
            serde_json::from_str(&json).map_err(|e| AssetStoreError::CorruptInfo {
                hash: hash.to_string(),
                message: e.to_string(),
            })?;
        Ok(Some(info))
    }

    /// Existence check on the bytes key.
    pub async fn exists(&self, hash: &str) -> Result<bool, AssetStoreError> {
        Ok(self.kv.exists(&self.bytes_key(hash)).await?)
    }

    /// Remove bytes and metadata. Returns true if either key existed.
    /// Intended only for explicit cleanup tooling; the save pipeline never
    /// deletes assets.
    #[instrument(skip(self))]
    pub async fn delete(&self, hash: &str) -> Result<bool, AssetStoreError> {
        let removed = self
            .kv
            .delete(&[self.bytes_key(hash), self.info_key(hash)])
            .await?;
        Ok(removed > 0)
    }
}
