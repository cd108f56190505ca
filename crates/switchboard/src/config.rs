//! Registry configuration.

use serde::Deserialize;
use std::path::PathBuf;

/// Top-level configuration for a registry instance.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Durable persistence for selections. `None` disables persistence.
    #[serde(default)]
    pub persistence: Option<PersistenceConfig>,
}

/// Durable-medium configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceConfig {
    /// Backend type: "inmemory", "file", or "none".
    #[serde(default = "default_backend")]
    pub backend: String,
    /// File path, required for the "file" backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Item key selections are stored under.
    #[serde(default = "default_storage_key")]
    pub key: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
            key: default_storage_key(),
        }
    }
}

fn default_backend() -> String {
    "inmemory".to_string()
}

fn default_storage_key() -> String {
    "switchboard.selections".to_string()
}
