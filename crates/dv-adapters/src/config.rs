//! Adapter configuration

use serde::{Deserialize, Serialize};

/// Storage configuration shared by every component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Connection URL for the key/value store.
    pub url: String,

    /// Namespace prefix prepended to every key and honored by every SCAN
    /// pattern and index prefix. May be empty.
    pub namespace: String,

    /// Whether saves trigger thumbnail generation.
    pub thumbnails_enabled: bool,
}

impl StorageConfig {
    /// Create configuration for local development
    pub fn local_dev() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            namespace: String::new(),
            thumbnails_enabled: true,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("DV_REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            namespace: std::env::var("DV_NAMESPACE").unwrap_or_default(),
            thumbnails_enabled: std::env::var("DV_THUMBNAILS_ENABLED")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::local_dev()
    }
}
