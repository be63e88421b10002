//! Deck metadata
//!
//! `DeckMeta` is shared verbatim between the legacy deck shape and the
//! manifest, and is additionally projected into its own storage key on every
//! save so listings and search never load full documents.
//!
//! Timestamps are millisecond-epoch integers so the search index can treat
//! them as numeric range fields. Unknown fields are kept in `extra` and
//! survive save/load cycles untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity, ownership and presentation metadata of a deck.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckMeta {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Millisecond epoch of first save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,

    /// Millisecond epoch of the latest save. Stamped by the repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_with: Vec<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub public: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    /// Opaque SHA-256 hex of the presenter password. Persisted and returned
    /// as data; never interpreted here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presenter_password_hash: Option<String>,

    /// Cover image as an asset reference (or, in the legacy shape, embedded
    /// binary awaiting promotion).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,

    /// Freeform string/number/boolean properties, preserved verbatim.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom_properties: Map<String, Value>,

    /// Unknown metadata fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
