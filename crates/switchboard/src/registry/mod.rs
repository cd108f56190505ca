//! Shared registries: available presets and current selections.
//!
//! A `Registry` is the ambient state one group of handlers operates
//! against. Most applications use the process-wide default via
//! `Registry::global()`; tests that want isolation construct their own with
//! `Registry::new()` and pass it to `HandlerBinding::new` /
//! `extend_handlers_with`. Suites sharing the global registry must call
//! `reset_all` between cases; that discipline is documented, not enforced.

mod presets;
mod selection;

pub use presets::PresetRegistry;
pub use selection::{PersistedSelection, Selection, SelectionRegistry, SelectionState};

use crate::config::RegistryConfig;
use crate::persistence::create_durable_store;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::error;

/// Preset and selection registries for one mocking scope.
pub struct Registry {
    pub presets: PresetRegistry,
    pub selections: SelectionRegistry,
}

impl Registry {
    /// Registry with persistence disabled.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Registry configured per `config`. A durable-store setup failure
    /// disables persistence rather than failing construction.
    pub fn with_config(config: RegistryConfig) -> Self {
        let selections = match &config.persistence {
            Some(persistence) => match create_durable_store(persistence) {
                Ok(medium) => SelectionRegistry::with_medium(medium, &persistence.key),
                Err(e) => {
                    error!("failed to create durable store: {e:#}; persistence disabled");
                    SelectionRegistry::new()
                }
            },
            None => SelectionRegistry::new(),
        };
        Self {
            presets: PresetRegistry::new(),
            selections,
        }
    }

    /// Process-wide default registry.
    pub fn global() -> &'static Arc<Registry> {
        static GLOBAL: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::new()));
        &GLOBAL
    }

    /// Wipe selections (including the active profile) and presets, then
    /// notify selection subscribers. Call between test cases that share
    /// this registry.
    pub fn reset_all(&self) {
        self.selections.clear_all();
        self.presets.clear_all();
        self.selections.publish();
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersistenceConfig;
    use crate::endpoint::HttpMethod;
    use crate::preset::Preset;
    use serde_json::json;

    #[test]
    fn test_reset_all_clears_both_registries() {
        let registry = Registry::new();
        let key = crate::endpoint::EndpointKey::new(HttpMethod::Get, "/a");
        registry
            .presets
            .set_presets(key.clone(), vec![Preset::json("default", 200, json!({}))]);
        registry.selections.set_selected(
            HttpMethod::Get,
            "/a",
            Selection::new(Preset::json("x", 200, json!({}))),
        );
        registry
            .selections
            .set_current_profile(Some("Primary".to_string()));

        registry.reset_all();
        assert!(registry.presets.get_presets(&key).is_none());
        assert!(registry.selections.get_selected(HttpMethod::Get, "/a").is_none());
        assert!(registry.selections.get_current_profile().is_none());
    }

    #[test]
    fn test_with_config_bad_backend_disables_persistence() {
        let registry = Registry::with_config(RegistryConfig {
            persistence: Some(PersistenceConfig {
                backend: "redis".to_string(),
                path: None,
                key: "k".to_string(),
            }),
        });
        // Still fully functional, just not persistent.
        registry.selections.set_selected(
            HttpMethod::Get,
            "/a",
            Selection::new(Preset::json("x", 200, json!({}))),
        );
        assert!(registry.selections.get_selected(HttpMethod::Get, "/a").is_some());
    }

    #[test]
    fn test_global_registry_is_shared() {
        let a = Arc::clone(Registry::global());
        let b = Arc::clone(Registry::global());
        assert!(Arc::ptr_eq(&a, &b));
    }
}
