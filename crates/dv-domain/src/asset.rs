//! Asset metadata
//!
//! Every stored asset carries a JSON sidecar describing it. The record is
//! immutable once written: re-uploading the same bytes never rewrites it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mime type recorded when the uploader did not supply one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Metadata sidecar attached to every stored asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    /// Lowercase hex SHA-256 of the asset bytes.
    pub sha256: String,

    /// Exact byte length of the stored blob.
    pub byte_size: u64,

    /// Mime type, defaulted to `application/octet-stream` when unknown.
    #[serde(default = "default_mime_type")]
    pub mime_type: String,

    /// Filename supplied by the first uploader, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,

    /// When the asset was first stored.
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

fn default_mime_type() -> String {
    DEFAULT_MIME_TYPE.to_string()
}

/// Caller-supplied portion of [`AssetInfo`] at upload time. Everything else
/// (hash, byte size, creation time) is derived by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewAssetInfo {
    pub mime_type: Option<String>,
    pub original_filename: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl NewAssetInfo {
    pub fn with_mime_type(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: Some(mime_type.into()),
            ..Default::default()
        }
    }
}
