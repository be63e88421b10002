//! Metadata search
//!
//! Two implementations behind one verb, selected at first use. When the
//! store carries the secondary-index capability the query is translated to
//! the index query language and executed there; otherwise every metadata
//! projection is SCANned, pipeline-loaded and filtered in memory. Both
//! modes answer the same queries with the same semantics: case-insensitive
//! title text, ANDed whole-string tags, exact owner, inclusive `updatedAt`
//! range, newest-updated first by default.
//!
//! The capability probe runs once and the result is pinned for the life of
//! the component, but only a genuine "capability absent" answer pins;
//! transient probe failures surface to the caller and leave the choice
//! open.

use std::cmp::Ordering;
use std::sync::Arc;

use dv_domain::{DeckMeta, SearchQuery, SortBy, SortOrder};
use dv_ports::{
    IndexField, IndexFieldKind, IndexQueryOpts, IndexSort, IndexSpec, KeyValueStore, KvError,
};
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

use crate::metrics::StoreMetrics;

/// Search errors
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl From<KvError> for SearchError {
    fn from(err: KvError) -> Self {
        SearchError::Storage {
            message: err.to_string(),
        }
    }
}

/// Which execution path answers queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Indexed,
    Fallback,
}

/// Indexed metadata query with SCAN fallback.
pub struct SearchIndex<S: KeyValueStore> {
    kv: Arc<S>,
    namespace: String,
    metrics: Arc<StoreMetrics>,
    mode: OnceCell<SearchMode>,
}

impl<S: KeyValueStore> SearchIndex<S> {
    pub fn new(kv: Arc<S>, namespace: impl Into<String>, metrics: Arc<StoreMetrics>) -> Self {
        Self {
            kv,
            namespace: namespace.into(),
            metrics,
            mode: OnceCell::new(),
        }
    }

    fn index_name(&self) -> String {
        format!("{}idx:doc-meta", self.namespace)
    }

    fn meta_scan_pattern(&self) -> String {
        format!("{}doc:*:meta", self.namespace)
    }

    fn index_spec(&self) -> IndexSpec {
        IndexSpec {
            name: self.index_name(),
            key_prefix: format!("{}doc:", self.namespace),
            fields: vec![
                IndexField {
                    json_path: "$.title".to_string(),
                    alias: "title".to_string(),
                    kind: IndexFieldKind::Text,
                    sortable: true,
                },
                IndexField {
                    json_path: "$.tags[*]".to_string(),
                    alias: "tags".to_string(),
                    kind: IndexFieldKind::Tag,
                    sortable: false,
                },
                IndexField {
                    json_path: "$.ownerId".to_string(),
                    alias: "ownerId".to_string(),
                    kind: IndexFieldKind::Tag,
                    sortable: false,
                },
                IndexField {
                    json_path: "$.createdAt".to_string(),
                    alias: "createdAt".to_string(),
                    kind: IndexFieldKind::Numeric,
                    sortable: true,
                },
                IndexField {
                    json_path: "$.updatedAt".to_string(),
                    alias: "updatedAt".to_string(),
                    kind: IndexFieldKind::Numeric,
                    sortable: true,
                },
                IndexField {
                    json_path: "$.slug".to_string(),
                    alias: "slug".to_string(),
                    kind: IndexFieldKind::Tag,
                    sortable: false,
                },
            ],
        }
    }

    /// Resolved execution mode, probing and pinning on first call.
    pub async fn mode(&self) -> Result<SearchMode, SearchError> {
        let mode = self
            .mode
            .get_or_try_init(|| async {
                if self.kv.index_probe().await? {
                    self.kv.index_create(&self.index_spec()).await?;
                    debug!("search pinned to indexed mode");
                    Ok::<_, KvError>(SearchMode::Indexed)
                } else {
                    debug!("index capability absent, search pinned to fallback mode");
                    Ok(SearchMode::Fallback)
                }
            })
            .await?;
        Ok(*mode)
    }

    /// Run a query and return matching metadata records.
    #[instrument(skip(self, query))]
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<DeckMeta>, SearchError> {
        StoreMetrics::incr(&self.metrics.searches);
        match self.mode().await? {
            SearchMode::Indexed => self.indexed_search(query).await,
            SearchMode::Fallback => self.fallback_search(query).await,
        }
    }

    async fn indexed_search(&self, query: &SearchQuery) -> Result<Vec<DeckMeta>, SearchError> {
        let name = self.index_name();
        let index_query = build_index_query(query);
        let opts = IndexQueryOpts {
            offset: query.effective_offset(),
            limit: query.effective_limit(),
            sort: translate_sort(query),
        };

        let page = match self.kv.index_search(&name, &index_query, &opts).await {
            Ok(page) => page,
            // The index may have been dropped out from under us; it is
            // created on demand, so recreate and retry once.
            Err(err) if is_index_missing_error(&err) => {
                self.kv.index_create(&self.index_spec()).await?;
                self.kv.index_search(&name, &index_query, &opts).await?
            }
            Err(err) => return Err(err.into()),
        };

        let mut results = Vec::with_capacity(page.hits.len());
        for hit in page.hits {
            match serde_json::from_str::<DeckMeta>(&hit.json) {
                Ok(meta) => results.push(meta),
                Err(err) => {
                    warn!(key = %hit.key, error = %err, "skipping corrupt metadata in search result");
                }
            }
        }
        Ok(results)
    }

    async fn fallback_search(&self, query: &SearchQuery) -> Result<Vec<DeckMeta>, SearchError> {
        let keys = self.kv.scan(&self.meta_scan_pattern()).await?;
        let docs = self.kv.get_documents(&keys).await?;

        let mut metas = Vec::new();
        for (key, doc) in keys.iter().zip(docs) {
            let Some(json) = doc else { continue };
            match serde_json::from_str::<DeckMeta>(&json) {
                Ok(meta) => metas.push(meta),
                Err(err) => {
                    warn!(key = %key, error = %err, "skipping corrupt metadata during scan");
                }
            }
        }

        let from_ms = query.date_from_ms();
        let to_ms = query.date_to_ms();
        metas.retain(|meta| matches_query(meta, query, from_ms, to_ms));

        let sort_by = query.effective_sort_by();
        let descending = query.effective_sort_order() == SortOrder::Desc;
        metas.sort_by(|a, b| {
            let ordering = compare_for_sort(a, b, sort_by);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        Ok(metas
            .into_iter()
            .skip(query.effective_offset())
            .take(query.effective_limit())
            .collect())
    }

    /// Create the index when the capability is present. Idempotent; returns
    /// false when it already existed or the capability is absent.
    pub async fn create_index(&self) -> Result<bool, SearchError> {
        match self.mode().await? {
            SearchMode::Indexed => Ok(self.kv.index_create(&self.index_spec()).await?),
            SearchMode::Fallback => Ok(false),
        }
    }

    /// Drop the index, optionally deleting indexed documents.
    pub async fn drop_index(&self, delete_documents: bool) -> Result<bool, SearchError> {
        match self.mode().await? {
            SearchMode::Indexed => Ok(self
                .kv
                .index_drop(&self.index_name(), delete_documents)
                .await?),
            SearchMode::Fallback => Ok(false),
        }
    }

    /// Raw index metadata, `None` in fallback mode or when absent.
    pub async fn index_info(&self) -> Result<Option<Map<String, Value>>, SearchError> {
        match self.mode().await? {
            SearchMode::Indexed => Ok(self.kv.index_info(&self.index_name()).await?),
            SearchMode::Fallback => Ok(None),
        }
    }

    /// Rebuild the index (where one exists) and return the number of
    /// documents visible to it. Idempotent.
    #[instrument(skip(self))]
    pub async fn reindex_all(&self) -> Result<usize, SearchError> {
        if self.mode().await? == SearchMode::Indexed {
            self.kv.index_drop(&self.index_name(), false).await?;
            self.kv.index_create(&self.index_spec()).await?;
        }
        let keys = self.kv.scan(&self.meta_scan_pattern()).await?;
        Ok(keys.len())
    }
}

fn is_index_missing_error(err: &KvError) -> bool {
    let message = err.to_string().to_ascii_lowercase();
    message.contains("unknown index") || message.contains("no such index")
}

/// Translate a query into the index query language. An unfiltered query is
/// the match-all `*`.
fn build_index_query(query: &SearchQuery) -> String {
    let mut clauses = Vec::new();

    if let Some(text) = query.text.as_deref().filter(|t| !t.is_empty()) {
        let tokens: Vec<String> = text.split_whitespace().map(escape_token).collect();
        if !tokens.is_empty() {
            clauses.push(format!("@title:({})", tokens.join(" ")));
        }
    }
    for tag in &query.tags {
        clauses.push(format!("@tags:{{{}}}", escape_token(tag)));
    }
    if let Some(owner) = query.owner_id.as_deref() {
        clauses.push(format!("@ownerId:{{{}}}", escape_token(owner)));
    }

    let from = query.date_from_ms();
    let to = query.date_to_ms();
    if from.is_some() || to.is_some() {
        clauses.push(format!(
            "@updatedAt:[{} {}]",
            from.map_or_else(|| "-inf".to_string(), |ms| ms.to_string()),
            to.map_or_else(|| "+inf".to_string(), |ms| ms.to_string()),
        ));
    }

    if clauses.is_empty() {
        "*".to_string()
    } else {
        clauses.join(" ")
    }
}

/// Escape index-syntax separators with a backslash.
fn escape_token(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if !c.is_alphanumeric() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn translate_sort(query: &SearchQuery) -> Option<IndexSort> {
    let ascending = query.effective_sort_order() == SortOrder::Asc;
    let field = match query.effective_sort_by() {
        // score ordering comes from the engine
        SortBy::Relevance => return None,
        SortBy::UpdatedAt => "updatedAt",
        SortBy::CreatedAt => "createdAt",
        SortBy::Title => "title",
    };
    Some(IndexSort {
        field: field.to_string(),
        ascending,
    })
}

fn matches_query(
    meta: &DeckMeta,
    query: &SearchQuery,
    from_ms: Option<i64>,
    to_ms: Option<i64>,
) -> bool {
    if let Some(text) = query.text.as_deref().filter(|t| !t.is_empty()) {
        if !meta.title.to_lowercase().contains(&text.to_lowercase()) {
            return false;
        }
    }
    if !query.tags.iter().all(|tag| meta.tags.contains(tag)) {
        return false;
    }
    if let Some(owner) = query.owner_id.as_deref() {
        if meta.owner_id.as_deref() != Some(owner) {
            return false;
        }
    }
    if let Some(from) = from_ms {
        if !meta.updated_at.is_some_and(|ts| ts >= from) {
            return false;
        }
    }
    if let Some(to) = to_ms {
        if !meta.updated_at.is_some_and(|ts| ts <= to) {
            return false;
        }
    }
    true
}

fn compare_for_sort(a: &DeckMeta, b: &DeckMeta, sort_by: SortBy) -> Ordering {
    match sort_by {
        // without an engine score, recency is the closest stand-in
        SortBy::Relevance | SortBy::UpdatedAt => {
            a.updated_at.unwrap_or(0).cmp(&b.updated_at.unwrap_or(0))
        }
        SortBy::CreatedAt => a.created_at.unwrap_or(0).cmp(&b.created_at.unwrap_or(0)),
        SortBy::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
    }
}
