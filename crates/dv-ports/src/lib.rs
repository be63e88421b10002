//! DeckVault Port Traits
//!
//! This crate defines the port interfaces (traits) that adapters must
//! implement:
//! - KeyValueStore: the storage contract (strings, binary blobs, sets,
//!   atomic write batches, SCAN enumeration, and an optional secondary-index
//!   capability)
//! - Clock: injectable wall-clock source
//! - ThumbnailRenderer: external renderer consuming a manifest

use std::future::Future;

use chrono::{DateTime, Utc};
use dv_domain::Manifest;
use serde_json::{Map, Value};

// ============================================================================
// KeyValueStore
// ============================================================================

/// One mutation inside an atomic write batch.
///
/// A batch either applies every write or none of them; a concurrent reader
/// never observes a partially applied batch.
#[derive(Debug, Clone, PartialEq)]
pub enum KvWrite {
    /// Unconditionally set a string value.
    PutString { key: String, value: String },

    /// Set a string value only if the key is absent.
    PutStringNx { key: String, value: String },

    /// Unconditionally set a binary value.
    PutBytes { key: String, value: Vec<u8> },

    /// Set a binary value only if the key is absent.
    PutBytesNx { key: String, value: Vec<u8> },

    /// Set a JSON document. Stores that carry a native JSON type use it so
    /// the secondary index can attach to the document; plain stores fall
    /// back to a string value. Read back with `get_document`.
    PutDocument { key: String, json: String },

    /// Remove a key of any type.
    Delete { key: String },

    /// Replace the entire membership of a set key. An empty member list
    /// leaves the key deleted.
    ReplaceSet { key: String, members: Vec<String> },
}

/// The storage contract the core is written against.
///
/// Implementations must make `apply` atomic and `PutStringNx`/`PutBytesNx`
/// first-writer-wins under arbitrary concurrency; everything else follows
/// from those two guarantees.
pub trait KeyValueStore: Send + Sync {
    /// Read a string value. `None` when absent.
    fn get_string(&self, key: &str) -> impl Future<Output = Result<Option<String>, KvError>> + Send;

    /// Pipelined multi-key string read, one slot per requested key.
    fn get_strings(
        &self,
        keys: &[String],
    ) -> impl Future<Output = Result<Vec<Option<String>>, KvError>> + Send;

    /// Read a binary value. `None` when absent.
    fn get_bytes(&self, key: &str)
        -> impl Future<Output = Result<Option<Vec<u8>>, KvError>> + Send;

    /// Read a JSON document written via [`KvWrite::PutDocument`].
    fn get_document(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, KvError>> + Send;

    /// Pipelined multi-key document read, one slot per requested key.
    fn get_documents(
        &self,
        keys: &[String],
    ) -> impl Future<Output = Result<Vec<Option<String>>, KvError>> + Send;

    /// Existence check on a single key.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, KvError>> + Send;

    /// Members of a set key; empty when absent.
    fn set_members(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Vec<String>, KvError>> + Send;

    /// Apply a write batch atomically.
    fn apply(&self, batch: Vec<KvWrite>) -> impl Future<Output = Result<(), KvError>> + Send;

    /// Delete keys in one round trip, returning how many existed.
    fn delete(&self, keys: &[String]) -> impl Future<Output = Result<u64, KvError>> + Send;

    /// Enumerate keys matching a glob pattern (`*` wildcard). Cursor
    /// handling is the adapter's business; the full result is returned.
    fn scan(&self, pattern: &str) -> impl Future<Output = Result<Vec<String>, KvError>> + Send;

    // --- optional secondary-index capability ---

    /// Probe for the secondary-index capability. `Ok(false)` means the
    /// capability is genuinely absent (callers may pin a fallback); an `Err`
    /// is transient and must not pin anything.
    fn index_probe(&self) -> impl Future<Output = Result<bool, KvError>> + Send;

    /// Create a secondary index. Idempotent; returns `false` when the index
    /// already existed.
    fn index_create(
        &self,
        spec: &IndexSpec,
    ) -> impl Future<Output = Result<bool, KvError>> + Send;

    /// Drop an index, optionally deleting the indexed documents. Returns
    /// `false` when no such index existed.
    fn index_drop(
        &self,
        name: &str,
        delete_documents: bool,
    ) -> impl Future<Output = Result<bool, KvError>> + Send;

    /// Raw index metadata, `None` when the index does not exist.
    fn index_info(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Map<String, Value>>, KvError>> + Send;

    /// Execute an index query and return matching documents.
    fn index_search(
        &self,
        name: &str,
        query: &str,
        opts: &IndexQueryOpts,
    ) -> impl Future<Output = Result<IndexSearchPage, KvError>> + Send;
}

/// Schema of a secondary index over JSON documents under a key prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub name: String,
    pub key_prefix: String,
    pub fields: Vec<IndexField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexField {
    /// JSON path into the document, e.g. `$.title` or `$.tags[*]`.
    pub json_path: String,
    /// Name the field is queried under.
    pub alias: String,
    pub kind: IndexFieldKind,
    pub sortable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFieldKind {
    /// Tokenized full-text, scorable.
    Text,
    /// Exact-match tag set.
    Tag,
    /// Numeric range field.
    Numeric,
}

/// Pagination and ordering for an index query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexQueryOpts {
    pub offset: usize,
    pub limit: usize,
    /// Field alias and direction; `None` leaves score ordering.
    pub sort: Option<IndexSort>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexSort {
    pub field: String,
    pub ascending: bool,
}

/// One page of index hits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSearchPage {
    /// Total matches, before pagination.
    pub total: u64,
    pub hits: Vec<IndexHit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub key: String,
    pub json: String,
}

/// Key/value store errors
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("capability not supported: {capability}")]
    Unsupported { capability: String },
}

impl KvError {
    pub fn storage(message: impl Into<String>) -> Self {
        KvError::Storage {
            message: message.into(),
        }
    }

    pub fn unsupported(capability: impl Into<String>) -> Self {
        KvError::Unsupported {
            capability: capability.into(),
        }
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Clock port for deterministic time handling
pub trait Clock: Send + Sync {
    /// Get the current UTC time
    fn now(&self) -> DateTime<Utc>;

    /// Current time as epoch milliseconds.
    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// System clock implementation
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ============================================================================
// ThumbnailRenderer
// ============================================================================

/// Default thumbnail width in pixels.
pub const THUMBNAIL_WIDTH: u32 = 320;

/// Default thumbnail height in pixels.
pub const THUMBNAIL_HEIGHT: u32 = 180;

/// Default WebP quality.
pub const THUMBNAIL_QUALITY: u8 = 80;

/// Requested thumbnail geometry and quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailParams {
    pub width: u32,
    pub height: u32,
    /// WebP quality, 0..=100.
    pub quality: u8,
}

impl Default for ThumbnailParams {
    fn default() -> Self {
        Self {
            width: THUMBNAIL_WIDTH,
            height: THUMBNAIL_HEIGHT,
            quality: THUMBNAIL_QUALITY,
        }
    }
}

/// External thumbnail renderer: consumes a manifest, emits an encoded image
/// buffer (WebP by default). The pixel work lives outside the core; the
/// core only stores whatever bytes come back.
pub trait ThumbnailRenderer: Send + Sync {
    fn render(
        &self,
        manifest: &Manifest,
        params: ThumbnailParams,
    ) -> impl Future<Output = Result<Vec<u8>, ThumbnailError>> + Send;
}

/// Renderer that declines every request. Used where thumbnail generation is
/// disabled or no renderer is wired in.
pub struct NoopRenderer;

impl ThumbnailRenderer for NoopRenderer {
    async fn render(
        &self,
        _manifest: &Manifest,
        _params: ThumbnailParams,
    ) -> Result<Vec<u8>, ThumbnailError> {
        Err(ThumbnailError::Unavailable)
    }
}

/// Thumbnail renderer errors
#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    #[error("no renderer available")]
    Unavailable,

    #[error("render failed: {message}")]
    RenderFailed { message: String },
}
