//! Backend-agnostic trait for the durable key-value medium.
//!
//! Selections optionally survive reloads by serializing through this trait.
//! The contract is deliberately tiny (`get_item`/`set_item`/`remove_item`,
//! string values) so that a browser-style local storage, a file, or an
//! in-memory map can all back it. Every caller treats failures as "persistence
//! disabled": logged, never propagated.

use crate::backends::{FileStore, InMemoryStore};
use crate::config::PersistenceConfig;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::info;

/// Durable key-value medium.
///
/// Intentionally synchronous: writes happen inside store mutations, which
/// are themselves synchronous.
pub trait DurableStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the value stored under `key`.
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// No-op medium that persists nothing.
///
/// Used when persistence is not configured. Reads always miss; writes are
/// discarded.
#[derive(Debug)]
pub struct NoOpStore;

impl DurableStore for NoOpStore {
    fn get_item(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    fn remove_item(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

/// Create a `DurableStore` based on configuration.
pub fn create_durable_store(config: &PersistenceConfig) -> Result<Arc<dyn DurableStore>> {
    match config.backend.as_str() {
        "inmemory" => {
            info!("Using InMemory durable store");
            Ok(Arc::new(InMemoryStore::new()))
        }
        "file" => {
            let path = config
                .path
                .clone()
                .ok_or_else(|| anyhow!("File backend selected but no path provided"))?;
            info!("Using File durable store at {}", path.display());
            Ok(Arc::new(FileStore::new(path)))
        }
        "none" => Ok(Arc::new(NoOpStore)),
        other => Err(anyhow!("Unknown persistence backend: {other}")),
    }
}
