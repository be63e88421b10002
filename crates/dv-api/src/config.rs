//! API service configuration

use dv_adapters::StorageConfig;

/// Configuration for the HTTP service.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Socket address the server binds.
    pub bind_addr: String,

    /// Storage connection, namespace and thumbnail flag.
    pub storage: StorageConfig,
}

impl ApiConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("DV_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            storage: StorageConfig::from_env(),
        }
    }
}
