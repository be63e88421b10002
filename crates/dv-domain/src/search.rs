//! Search queries and listing briefs
//!
//! Queries are tolerant: an out-of-range limit is coerced into range rather
//! than rejected, and unparseable date bounds are ignored.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::meta::DeckMeta;

/// Hard cap on a single page of search results.
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Page size applied when the query does not specify one.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    Relevance,
    #[default]
    UpdatedAt,
    CreatedAt,
    Title,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// A metadata query. All filters are optional; an empty query matches every
/// document, newest-updated first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchQuery {
    /// Title text. Substring, case-insensitive.
    pub text: Option<String>,

    /// Tags ANDed together; each compared as a whole string.
    pub tags: Vec<String>,

    /// Exact owner match.
    pub owner_id: Option<String>,

    /// Inclusive ISO-8601 lower bound on `updatedAt`.
    pub date_from: Option<String>,

    /// Inclusive ISO-8601 upper bound on `updatedAt`.
    pub date_to: Option<String>,

    pub limit: Option<usize>,

    pub offset: Option<usize>,

    pub sort_by: Option<SortBy>,

    pub sort_order: Option<SortOrder>,
}

impl SearchQuery {
    /// Requested page size, coerced into `1..=100`.
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT)
    }

    pub fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    pub fn effective_sort_by(&self) -> SortBy {
        self.sort_by.unwrap_or_default()
    }

    pub fn effective_sort_order(&self) -> SortOrder {
        self.sort_order.unwrap_or_default()
    }

    /// Lower bound in epoch milliseconds; unparseable input is ignored.
    pub fn date_from_ms(&self) -> Option<i64> {
        parse_date_ms(self.date_from.as_deref())
    }

    /// Upper bound in epoch milliseconds; unparseable input is ignored.
    pub fn date_to_ms(&self) -> Option<i64> {
        parse_date_ms(self.date_to.as_deref())
    }

    /// True when no filter is set at all.
    pub fn is_unfiltered(&self) -> bool {
        self.text.as_deref().map_or(true, str::is_empty)
            && self.tags.is_empty()
            && self.owner_id.is_none()
            && self.date_from_ms().is_none()
            && self.date_to_ms().is_none()
    }
}

fn parse_date_ms(value: Option<&str>) -> Option<i64> {
    let value = value?;
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// One row of a deck listing: enough to render a picker without loading the
/// document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckBrief {
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_with: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl DeckBrief {
    pub fn from_meta(meta: &DeckMeta) -> Self {
        Self {
            id: meta.id.clone(),
            title: meta.title.clone(),
            updated_at: meta.updated_at,
            created_at: meta.created_at,
            slug: meta.slug.clone(),
            owner_id: meta.owner_id.clone(),
            shared_with: meta.shared_with.clone(),
            deleted_at: meta.deleted_at,
        }
    }
}
