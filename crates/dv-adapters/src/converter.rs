//! Legacy deck <-> manifest conversion
//!
//! Forward conversion walks every asset slot of a legacy deck, uploads
//! embedded binary (base64 data-URIs) to the asset store and rewrites the
//! slot to an `asset://sha256:<hash>` reference. Values that are already
//! references are recorded as-is; external URLs and opaque identifiers
//! (stock ids, color strings that slipped into binary slots) pass through
//! untouched; only in-band binary is promoted.
//!
//! The input document is never mutated; callers keep their tree.
//!
//! Reverse conversion drops the schema stamp and assets registry. By
//! default references are returned as-is; under [`InlineAssets::Expand`]
//! they are expanded back into data-URIs by fetching bytes and mime type.

use std::collections::BTreeSet;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use dv_domain::{
    extract_hash, looks_like_reference, make_reference, manifest_asset_slots_mut, Deck,
    DomainError, Manifest, NewAssetInfo, SchemaInfo, SlotRef, DEFAULT_MIME_TYPE, SCHEMA_VERSION,
};
use dv_ports::{Clock, KeyValueStore};
use tracing::instrument;

use crate::asset_store::{AssetStore, AssetStoreError};

/// Whether reverse conversion expands references back into data-URIs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InlineAssets {
    /// Leave references in place; callers resolve them via the asset store.
    #[default]
    Keep,
    /// Fetch bytes and mime type, re-embed as `data:<mime>;base64,...`.
    Expand,
}

/// Conversion errors
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("bad asset reference: {value}")]
    BadReference { value: String },

    #[error("embedded data at {slot} does not decode: {message}")]
    InvalidDataUri { slot: &'static str, message: String },

    #[error("asset ingestion failed: {source}")]
    AssetPutFailed {
        #[source]
        source: AssetStoreError,
    },

    #[error("cyclic group detected at {group_id}")]
    CyclicGroup { group_id: String },

    #[error("storage error: {message}")]
    Storage { message: String },
}

impl From<DomainError> for ConvertError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::BadReference { value } => ConvertError::BadReference { value },
            DomainError::CyclicGroup { group_id } => ConvertError::CyclicGroup { group_id },
        }
    }
}

/// Bidirectional transform between the legacy and manifest forms.
pub struct Converter<S: KeyValueStore> {
    assets: Arc<AssetStore<S>>,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore> Converter<S> {
    pub fn new(assets: Arc<AssetStore<S>>, clock: Arc<dyn Clock>) -> Self {
        Self { assets, clock }
    }

    /// Convert a legacy deck into a manifest, ingesting embedded assets.
    ///
    /// Deterministic for a given input and clock; idempotent on slots that
    /// already hold references.
    #[instrument(skip(self, deck), fields(deck_id = %deck.meta.id))]
    pub async fn deck_to_manifest(&self, deck: &Deck) -> Result<Manifest, ConvertError> {
        let mut manifest = Manifest {
            schema: SchemaInfo {
                version: SCHEMA_VERSION.to_string(),
                engine_min: None,
                migrated_at: Some(self.clock.now()),
            },
            meta: deck.meta.clone(),
            slides: deck.slides.clone(),
            assets: Default::default(),
            settings: deck.settings.clone(),
            theme: deck.theme.clone(),
            provenance: deck.provenance.clone(),
        };

        let mut hashes = BTreeSet::new();
        {
            let slots = manifest_asset_slots_mut(&mut manifest)?;
            for slot in slots {
                self.promote_slot(slot, &mut hashes).await?;
            }
        }

        manifest.assets = hashes
            .iter()
            .map(|hash| {
                let reference = make_reference(hash);
                (reference.clone(), reference)
            })
            .collect();

        Ok(manifest)
    }

    async fn promote_slot(
        &self,
        slot: SlotRef<'_>,
        hashes: &mut BTreeSet<String>,
    ) -> Result<(), ConvertError> {
        let value = slot.value;

        if looks_like_reference(value) {
            let hash = extract_hash(value)?;
            hashes.insert(hash.to_string());
            return Ok(());
        }

        if let Some((mime, payload)) = parse_data_uri(value) {
            let bytes = BASE64
                .decode(payload)
                .map_err(|e| ConvertError::InvalidDataUri {
                    slot: slot.slot.as_str(),
                    message: e.to_string(),
                })?;
            let hash = self
                .assets
                .put(&bytes, NewAssetInfo::with_mime_type(mime))
                .await
                .map_err(|source| ConvertError::AssetPutFailed { source })?;
            *value = make_reference(&hash);
            hashes.insert(hash);
            return Ok(());
        }

        // External URL or opaque identifier; a legitimate out-of-band
        // reference that stays untouched.
        Ok(())
    }

    /// Convert a manifest back to the legacy shape.
    #[instrument(skip(self, manifest), fields(deck_id = %manifest.meta.id))]
    pub async fn manifest_to_deck(
        &self,
        manifest: &Manifest,
        inline: InlineAssets,
    ) -> Result<Deck, ConvertError> {
        let mut deck = Deck {
            meta: manifest.meta.clone(),
            slides: manifest.slides.clone(),
            settings: manifest.settings.clone(),
            theme: manifest.theme.clone(),
            provenance: manifest.provenance.clone(),
        };

        if inline == InlineAssets::Expand {
            let slots = dv_domain::deck_asset_slots_mut(&mut deck)?;
            for slot in slots {
                self.inline_slot(slot).await?;
            }
        }

        Ok(deck)
    }

    async fn inline_slot(&self, slot: SlotRef<'_>) -> Result<(), ConvertError> {
        let value = slot.value;
        if !looks_like_reference(value) {
            return Ok(());
        }
        let hash = extract_hash(value)?.to_string();

        let bytes = match self.assets.get(&hash).await {
            Ok(Some(bytes)) => bytes,
            // An unresolvable reference stays a reference; the caller still
            // holds a syntactically valid pointer.
            Ok(None) => return Ok(()),
            Err(err) => {
                return Err(ConvertError::Storage {
                    message: err.to_string(),
                })
            }
        };
        let mime = match self.assets.info(&hash).await {
            Ok(Some(info)) => info.mime_type,
            Ok(None) => DEFAULT_MIME_TYPE.to_string(),
            Err(err) => {
                return Err(ConvertError::Storage {
                    message: err.to_string(),
                })
            }
        };

        *value = format!("data:{mime};base64,{}", BASE64.encode(&bytes));
        Ok(())
    }
}

/// Split a base64 data-URI into mime type and payload. Anything that is not
/// a base64 data-URI (including percent-encoded `data:` URIs) returns
/// `None` and is left where it was found.
fn parse_data_uri(value: &str) -> Option<(String, &str)> {
    let rest = value.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let header = header.strip_suffix(";base64")?;
    let mime = header.split(';').next().unwrap_or_default();
    let mime = if mime.is_empty() {
        DEFAULT_MIME_TYPE.to_string()
    } else {
        mime.to_string()
    };
    Some((mime, payload))
}
