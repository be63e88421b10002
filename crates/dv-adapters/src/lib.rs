//! DeckVault Adapter Implementations
//!
//! This crate provides the concrete pieces behind the ports defined in
//! dv-ports, plus the storage components that drive them:
//! - Redis key/value adapter (pipelines, SCAN, optional search module)
//! - In-memory key/value adapter for tests and embedded use
//! - AssetStore: content-addressed binary store with dedupe
//! - Converter: legacy deck <-> manifest transform with asset promotion
//! - DocRepository: manifest/metadata/asset-set/thumbnail persistence
//! - SearchIndex: indexed metadata query with SCAN fallback
//! - DeckService: the outward verb set blending both document formats

pub mod asset_store;
pub mod config;
pub mod converter;
pub mod deck_service;
pub mod doc_repository;
pub mod memory;
pub mod metrics;
pub mod redis_kv;
pub mod search;

pub use asset_store::{AssetStore, AssetStoreError};
pub use config::StorageConfig;
pub use converter::{ConvertError, Converter, InlineAssets};
pub use deck_service::{DeckService, ServiceError};
pub use doc_repository::{DocRepository, RepositoryError};
pub use memory::MemoryKv;
pub use metrics::{MetricsSnapshot, StoreMetrics};
pub use redis_kv::RedisKv;
pub use search::{SearchError, SearchIndex, SearchMode};
