//! Observability counters
//!
//! Every read/save/dedupe event bumps a counter here. The struct is shared
//! across components through an `Arc` and snapshotted for reporting.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Count hooks over the storage core.
#[derive(Debug, Default)]
pub struct StoreMetrics {
    pub asset_puts: AtomicU64,
    pub asset_dedupe_hits: AtomicU64,
    pub asset_reads: AtomicU64,
    pub manifest_saves: AtomicU64,
    pub manifest_reads: AtomicU64,
    pub meta_reads: AtomicU64,
    pub searches: AtomicU64,
    pub lists: AtomicU64,
    pub deletes: AtomicU64,
    pub thumbnail_failures: AtomicU64,
}

impl StoreMetrics {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            asset_puts: self.asset_puts.load(Ordering::Relaxed),
            asset_dedupe_hits: self.asset_dedupe_hits.load(Ordering::Relaxed),
            asset_reads: self.asset_reads.load(Ordering::Relaxed),
            manifest_saves: self.manifest_saves.load(Ordering::Relaxed),
            manifest_reads: self.manifest_reads.load(Ordering::Relaxed),
            meta_reads: self.meta_reads.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
            lists: self.lists.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            thumbnail_failures: self.thumbnail_failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`StoreMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub asset_puts: u64,
    pub asset_dedupe_hits: u64,
    pub asset_reads: u64,
    pub manifest_saves: u64,
    pub manifest_reads: u64,
    pub meta_reads: u64,
    pub searches: u64,
    pub lists: u64,
    pub deletes: u64,
    pub thumbnail_failures: u64,
}
