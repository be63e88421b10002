//! Deck documents: the legacy self-contained shape and the split manifest
//!
//! A `Deck` is what editors hand in and get back: the whole tree with
//! binaries either embedded (data-URIs) or referenced. A `Manifest` is the
//! persisted form: the identical tree with every embedded binary promoted to
//! an `asset://sha256:<hash>` reference, plus a `schema` stamp and the
//! `assets` registry of every reference the document uses.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::meta::DeckMeta;
use crate::slide::{Background, Slide};

/// Manifest schema version written by the converter.
pub const SCHEMA_VERSION: &str = "v1.0";

/// Schema stamp on every manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaInfo {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_min: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrated_at: Option<DateTime<Utc>>,
}

impl Default for SchemaInfo {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            engine_min: None,
            migrated_at: None,
        }
    }
}

/// The persisted, split document form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub schema: SchemaInfo,

    #[serde(default)]
    pub meta: DeckMeta,

    #[serde(default)]
    pub slides: Vec<Slide>,

    /// Registry of every asset reference used by this manifest. Keys equal
    /// values; the mapping is preserved verbatim across round-trips.
    #[serde(default)]
    pub assets: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<DeckSettings>,

    /// Opaque passthrough.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Value>,

    /// Opaque passthrough.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Value>,
}

/// The legacy, self-contained document form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    #[serde(default)]
    pub meta: DeckMeta,

    #[serde(default)]
    pub slides: Vec<Slide>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<DeckSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Value>,
}

/// Deck-wide presentation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_background: Option<Background>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branding: Option<Branding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_size: Option<SlideSize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<BrandingLogo>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Branding logo. `src` is an asset slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingLogo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideSize {
    pub width: f64,
    pub height: f64,
}
