//! Deck service facade
//!
//! The outward verb set callers use. This is the only place that knows
//! about both document layouts: the split manifest keys (`doc:<id>:*`) and
//! the legacy self-contained blob (`deck:<id>:data` with its `:history` and
//! `:meta` companions). Reads prefer the manifest and fall back to the
//! legacy blob; listings blend both with the new format winning on id
//! collisions; deletes clear both families in one pipeline.
//!
//! Thumbnail generation is best-effort: a renderer failure is logged and
//! counted, never surfaced.

use std::collections::BTreeMap;
use std::sync::Arc;

use dv_domain::{Deck, DeckBrief, DeckMeta, Manifest, SearchQuery};
use dv_ports::{
    Clock, KeyValueStore, KvError, SystemClock, ThumbnailError, ThumbnailParams,
    ThumbnailRenderer,
};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::asset_store::AssetStore;
use crate::config::StorageConfig;
use crate::converter::{ConvertError, Converter, InlineAssets};
use crate::doc_repository::{DocRepository, RepositoryError};
use crate::metrics::{MetricsSnapshot, StoreMetrics};
use crate::search::{SearchError, SearchIndex};

/// Facade errors, wrapped with the deck id where one applies.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("corrupt data for deck {id}: {message}")]
    CorruptData { id: String, message: String },

    #[error("conversion failed for deck {id}: {source}")]
    Convert {
        id: String,
        #[source]
        source: ConvertError,
    },

    #[error(transparent)]
    Search(#[from] SearchError),
}

impl ServiceError {
    fn storage(id: &str, err: impl std::fmt::Display) -> Self {
        ServiceError::Storage {
            message: format!("deck {id}: {err}"),
        }
    }

    fn from_repository(id: &str, err: RepositoryError) -> Self {
        match err {
            RepositoryError::CorruptData { id, message } => {
                ServiceError::CorruptData { id, message }
            }
            RepositoryError::Domain(domain) => ServiceError::Convert {
                id: id.to_string(),
                source: domain.into(),
            },
            other => ServiceError::storage(id, other),
        }
    }
}

impl From<KvError> for ServiceError {
    fn from(err: KvError) -> Self {
        ServiceError::Storage {
            message: err.to_string(),
        }
    }
}

/// The outward verbs over the storage core.
pub struct DeckService<S: KeyValueStore, R: ThumbnailRenderer> {
    kv: Arc<S>,
    assets: Arc<AssetStore<S>>,
    converter: Converter<S>,
    repo: DocRepository<S>,
    search: SearchIndex<S>,
    renderer: R,
    namespace: String,
    thumbnails_enabled: bool,
    metrics: Arc<StoreMetrics>,
}

impl<S: KeyValueStore, R: ThumbnailRenderer> DeckService<S, R> {
    pub fn new(kv: Arc<S>, renderer: R, config: &StorageConfig) -> Self {
        Self::with_clock(kv, renderer, config, Arc::new(SystemClock))
    }

    /// Build with an injected clock so tests can freeze time.
    pub fn with_clock(
        kv: Arc<S>,
        renderer: R,
        config: &StorageConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let metrics = Arc::new(StoreMetrics::default());
        let assets = Arc::new(AssetStore::new(
            kv.clone(),
            config.namespace.clone(),
            clock.clone(),
            metrics.clone(),
        ));
        Self {
            renderer,
            converter: Converter::new(assets.clone(), clock.clone()),
            repo: DocRepository::new(
                kv.clone(),
                config.namespace.clone(),
                clock,
                metrics.clone(),
            ),
            search: SearchIndex::new(kv.clone(), config.namespace.clone(), metrics.clone()),
            assets,
            kv,
            namespace: config.namespace.clone(),
            thumbnails_enabled: config.thumbnails_enabled,
            metrics,
        }
    }

    /// The content-addressed asset store backing this service.
    pub fn assets(&self) -> &AssetStore<S> {
        &self.assets
    }

    /// The document repository backing this service.
    pub fn repository(&self) -> &DocRepository<S> {
        &self.repo
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn legacy_data_key(&self, id: &str) -> String {
        format!("{}deck:{}:data", self.namespace, id)
    }

    fn legacy_history_key(&self, id: &str) -> String {
        format!("{}deck:{}:history", self.namespace, id)
    }

    fn legacy_meta_key(&self, id: &str) -> String {
        format!("{}deck:{}:meta", self.namespace, id)
    }

    fn legacy_scan_pattern(&self) -> String {
        format!("{}deck:*:data", self.namespace)
    }

    fn id_from_legacy_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(&self.namespace)?
            .strip_prefix("deck:")?
            .strip_suffix(":data")
    }

    /// Load a deck in the legacy shape, whichever format it is stored in.
    /// `None` when the id exists in neither.
    pub async fn get_deck(&self, id: &str) -> Result<Option<Deck>, ServiceError> {
        self.get_deck_opts(id, InlineAssets::Keep).await
    }

    /// Like [`Self::get_deck`], optionally expanding references back into
    /// data-URIs.
    #[instrument(skip(self))]
    pub async fn get_deck_opts(
        &self,
        id: &str,
        inline: InlineAssets,
    ) -> Result<Option<Deck>, ServiceError> {
        if let Some(manifest) = self
            .repo
            .get_manifest(id)
            .await
            .map_err(|e| ServiceError::from_repository(id, e))?
        {
            let deck = self
                .converter
                .manifest_to_deck(&manifest, inline)
                .await
                .map_err(|source| ServiceError::Convert {
                    id: id.to_string(),
                    source,
                })?;
            return Ok(Some(deck));
        }

        let Some(raw) = self
            .kv
            .get_string(&self.legacy_data_key(id))
            .await
            .map_err(|e| ServiceError::storage(id, e))?
        else {
            return Ok(None);
        };
        let mut deck: Deck =
            serde_json::from_str(&raw).map_err(|e| ServiceError::CorruptData {
                id: id.to_string(),
                message: e.to_string(),
            })?;
        if deck.meta.id.is_empty() {
            deck.meta.id = id.to_string();
        }
        Ok(Some(deck))
    }

    /// Convert, persist and (best-effort) re-render the thumbnail. Returns
    /// the saved manifest.
    #[instrument(skip(self, deck))]
    pub async fn save_deck(&self, id: &str, deck: &Deck) -> Result<Manifest, ServiceError> {
        let mut manifest =
            self.converter
                .deck_to_manifest(deck)
                .await
                .map_err(|source| ServiceError::Convert {
                    id: id.to_string(),
                    source,
                })?;
        if manifest.meta.id.is_empty() {
            manifest.meta.id = id.to_string();
        }
        self.repo
            .save_manifest(id, &mut manifest)
            .await
            .map_err(|e| ServiceError::from_repository(id, e))?;

        if self.thumbnails_enabled {
            self.refresh_thumbnail(id, &manifest).await;
        }

        info!(id, assets = manifest.assets.len(), "deck saved");
        Ok(manifest)
    }

    /// Never fails the save: renderer and storage problems are logged and
    /// counted only.
    async fn refresh_thumbnail(&self, id: &str, manifest: &Manifest) {
        match self
            .renderer
            .render(manifest, ThumbnailParams::default())
            .await
        {
            Ok(bytes) => {
                if let Err(err) = self.repo.save_thumbnail(id, bytes).await {
                    StoreMetrics::incr(&self.metrics.thumbnail_failures);
                    warn!(id, error = %err, "failed to store thumbnail");
                }
            }
            Err(ThumbnailError::Unavailable) => {
                debug!(id, "no thumbnail renderer wired in");
            }
            Err(err) => {
                StoreMetrics::incr(&self.metrics.thumbnail_failures);
                warn!(id, error = %err, "thumbnail generation failed");
            }
        }
    }

    /// Brief rows for every deck in either format. A doubly-stored id
    /// appears once, with the new format winning. Corrupt entries are
    /// skipped and logged.
    #[instrument(skip(self))]
    pub async fn list_decks(&self) -> Result<Vec<DeckBrief>, ServiceError> {
        StoreMetrics::incr(&self.metrics.lists);
        let mut briefs: BTreeMap<String, DeckBrief> = BTreeMap::new();

        // Legacy blobs first; new-format rows below overwrite on collision.
        let legacy_keys = self.kv.scan(&self.legacy_scan_pattern()).await?;
        let blobs = self.kv.get_strings(&legacy_keys).await?;
        for (key, blob) in legacy_keys.iter().zip(blobs) {
            let Some(raw) = blob else { continue };
            let Some(id) = self.id_from_legacy_key(key) else {
                continue;
            };
            match serde_json::from_str::<Deck>(&raw) {
                Ok(deck) => {
                    let mut brief = DeckBrief::from_meta(&deck.meta);
                    if brief.id.is_empty() {
                        brief.id = id.to_string();
                    }
                    briefs.insert(brief.id.clone(), brief);
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "skipping corrupt legacy deck in listing");
                }
            }
        }

        let manifest_keys = self.kv.scan(&self.repo.manifest_scan_pattern()).await?;
        let ids: Vec<String> = manifest_keys
            .iter()
            .filter_map(|key| self.repo.id_from_manifest_key(key))
            .map(str::to_string)
            .collect();
        let meta_keys: Vec<String> = ids.iter().map(|id| self.repo.meta_key(id)).collect();
        let docs = self.kv.get_documents(&meta_keys).await?;
        for (id, doc) in ids.iter().zip(docs) {
            let Some(json) = doc else {
                warn!(id, "manifest without metadata projection, skipping in listing");
                continue;
            };
            match serde_json::from_str::<DeckMeta>(&json) {
                Ok(meta) => {
                    let mut brief = DeckBrief::from_meta(&meta);
                    if brief.id.is_empty() {
                        brief.id = id.clone();
                    }
                    briefs.insert(brief.id.clone(), brief);
                }
                Err(err) => {
                    warn!(id, error = %err, "skipping corrupt metadata in listing");
                }
            }
        }

        let mut rows: Vec<DeckBrief> = briefs.into_values().collect();
        rows.sort_by(|a, b| b.updated_at.unwrap_or(0).cmp(&a.updated_at.unwrap_or(0)));
        Ok(rows)
    }

    /// Remove every key of both formats in one pipeline. Asset blobs stay.
    #[instrument(skip(self))]
    pub async fn delete_deck(&self, id: &str) -> Result<(), ServiceError> {
        self.kv
            .delete(&[
                self.repo.manifest_key(id),
                self.repo.meta_key(id),
                self.repo.assets_key(id),
                self.repo.thumb_key(id),
                self.legacy_data_key(id),
                self.legacy_history_key(id),
                self.legacy_meta_key(id),
            ])
            .await
            .map_err(|e| ServiceError::storage(id, e))?;
        StoreMetrics::incr(&self.metrics.deletes);
        info!(id, "deck deleted");
        Ok(())
    }

    /// True when the id exists in either format.
    pub async fn deck_exists(&self, id: &str) -> Result<bool, ServiceError> {
        if self
            .repo
            .exists(id)
            .await
            .map_err(|e| ServiceError::from_repository(id, e))?
        {
            return Ok(true);
        }
        Ok(self
            .kv
            .exists(&self.legacy_data_key(id))
            .await
            .map_err(|e| ServiceError::storage(id, e))?)
    }

    /// Metadata only, preferring the cheap projection over parsing a blob.
    #[instrument(skip(self))]
    pub async fn get_deck_metadata(&self, id: &str) -> Result<Option<DeckMeta>, ServiceError> {
        if let Some(meta) = self
            .repo
            .get_meta(id)
            .await
            .map_err(|e| ServiceError::from_repository(id, e))?
        {
            return Ok(Some(meta));
        }

        let Some(raw) = self
            .kv
            .get_string(&self.legacy_data_key(id))
            .await
            .map_err(|e| ServiceError::storage(id, e))?
        else {
            return Ok(None);
        };
        let deck: Deck = serde_json::from_str(&raw).map_err(|e| ServiceError::CorruptData {
            id: id.to_string(),
            message: e.to_string(),
        })?;
        let mut meta = deck.meta;
        if meta.id.is_empty() {
            meta.id = id.to_string();
        }
        Ok(Some(meta))
    }

    pub async fn get_deck_thumbnail(&self, id: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        self.repo
            .get_thumbnail(id)
            .await
            .map_err(|e| ServiceError::from_repository(id, e))
    }

    /// Convert a legacy blob into the split format. `None` when no legacy
    /// blob exists. With `destructive`, the blob and its deprecated history
    /// companion are removed after the save.
    #[instrument(skip(self))]
    pub async fn migrate_deck(
        &self,
        id: &str,
        destructive: bool,
    ) -> Result<Option<Manifest>, ServiceError> {
        let Some(raw) = self
            .kv
            .get_string(&self.legacy_data_key(id))
            .await
            .map_err(|e| ServiceError::storage(id, e))?
        else {
            return Ok(None);
        };
        let deck: Deck = serde_json::from_str(&raw).map_err(|e| ServiceError::CorruptData {
            id: id.to_string(),
            message: e.to_string(),
        })?;

        let manifest = self.save_deck(id, &deck).await?;

        if destructive {
            self.kv
                .delete(&[self.legacy_data_key(id), self.legacy_history_key(id)])
                .await
                .map_err(|e| ServiceError::storage(id, e))?;
            info!(id, "legacy blob removed after migration");
        }
        Ok(Some(manifest))
    }

    /// Query metadata via the search component.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<DeckMeta>, ServiceError> {
        Ok(self.search.search(query).await?)
    }

    pub async fn create_index(&self) -> Result<bool, ServiceError> {
        Ok(self.search.create_index().await?)
    }

    pub async fn drop_index(&self, delete_documents: bool) -> Result<bool, ServiceError> {
        Ok(self.search.drop_index(delete_documents).await?)
    }

    pub async fn index_info(&self) -> Result<Option<Map<String, Value>>, ServiceError> {
        Ok(self.search.index_info().await?)
    }

    pub async fn reindex_all(&self) -> Result<usize, ServiceError> {
        Ok(self.search.reindex_all().await?)
    }
}
