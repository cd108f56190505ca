//! Per-endpoint preset lists.

use crate::endpoint::EndpointKey;
use crate::preset::Preset;
use crate::store::KeyedStore;
use std::collections::HashMap;
use tracing::warn;

/// Stores, per endpoint key, the ordered list of available presets.
///
/// The zeroth entry is always the endpoint's own default preset; extending a
/// binding appends, never drops or reorders earlier presets.
pub struct PresetRegistry {
    store: KeyedStore<HashMap<EndpointKey, Vec<Preset>>>,
}

impl PresetRegistry {
    pub fn new() -> Self {
        Self {
            store: KeyedStore::new(HashMap::new()),
        }
    }

    /// Replace the full preset list for `key`. Used at binding declaration.
    pub fn set_presets(&self, key: EndpointKey, presets: Vec<Preset>) {
        self.store.update_silent(|map| {
            map.insert(key, presets);
        });
    }

    /// Append presets to `key`'s list, preserving order. Duplicate and
    /// reserved labels are skipped with a warning; the mistake resurfaces
    /// loudly as `PresetNotFound` if the label is later selected.
    pub fn append_presets(&self, key: &EndpointKey, presets: Vec<Preset>) {
        self.store.update_silent(|map| {
            let list = map.entry(key.clone()).or_default();
            for preset in presets {
                if Preset::is_reserved_label(&preset.label) {
                    warn!("skipping reserved preset label '{}' on {key}", preset.label);
                    continue;
                }
                if list.iter().any(|existing| existing.label == preset.label) {
                    warn!("skipping duplicate preset label '{}' on {key}", preset.label);
                    continue;
                }
                list.push(preset);
            }
        });
    }

    pub fn get_presets(&self, key: &EndpointKey) -> Option<Vec<Preset>> {
        self.store.read(|map| map.get(key).cloned())
    }

    /// Look up one preset by label.
    pub fn find_preset(&self, key: &EndpointKey, label: &str) -> Option<Preset> {
        self.store.read(|map| {
            map.get(key)
                .and_then(|list| list.iter().find(|p| p.label == label).cloned())
        })
    }

    pub fn clear_all(&self) {
        self.store.update_silent(HashMap::clear);
    }
}

impl Default for PresetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::HttpMethod;
    use crate::preset::DEFAULT_PRESET;
    use serde_json::json;

    fn key() -> EndpointKey {
        EndpointKey::new(HttpMethod::Get, "/api/users")
    }

    fn default_preset() -> Preset {
        Preset::json(DEFAULT_PRESET, 200, json!({"users": []}))
    }

    #[test]
    fn test_set_and_get_presets() {
        let registry = PresetRegistry::new();
        registry.set_presets(key(), vec![default_preset()]);

        let presets = registry.get_presets(&key()).unwrap();
        assert_eq!(presets.len(), 1);
        assert_eq!(presets[0].label, "default");
        assert!(registry
            .get_presets(&EndpointKey::new(HttpMethod::Post, "/api/users"))
            .is_none());
    }

    #[test]
    fn test_append_keeps_default_first() {
        let registry = PresetRegistry::new();
        registry.set_presets(key(), vec![default_preset()]);
        registry.append_presets(&key(), vec![Preset::json("empty", 200, json!({"users": []}))]);
        registry.append_presets(
            &key(),
            vec![Preset::json("error", 500, json!({"message": "boom"}))],
        );

        let labels: Vec<String> = registry
            .get_presets(&key())
            .unwrap()
            .iter()
            .map(|p| p.label.clone())
            .collect();
        assert_eq!(labels, vec!["default", "empty", "error"]);
    }

    #[test]
    fn test_append_skips_duplicate_and_reserved_labels() {
        let registry = PresetRegistry::new();
        registry.set_presets(key(), vec![default_preset()]);
        registry.append_presets(
            &key(),
            vec![
                Preset::json("empty", 200, json!({})),
                Preset::json("empty", 404, json!({})),
                Preset::json("default", 200, json!({})),
                Preset::json("__REAL_API__", 200, json!({})),
            ],
        );

        let presets = registry.get_presets(&key()).unwrap();
        assert_eq!(presets.len(), 2);
        assert_eq!(presets[1].label, "empty");
        assert_eq!(presets[1].status, 200);
    }

    #[test]
    fn test_find_preset() {
        let registry = PresetRegistry::new();
        registry.set_presets(key(), vec![default_preset()]);
        registry.append_presets(&key(), vec![Preset::json("empty", 204, json!({}))]);

        assert_eq!(registry.find_preset(&key(), "empty").unwrap().status, 204);
        assert!(registry.find_preset(&key(), "nope").is_none());
    }

    #[test]
    fn test_clear_all() {
        let registry = PresetRegistry::new();
        registry.set_presets(key(), vec![default_preset()]);
        registry.clear_all();
        assert!(registry.get_presets(&key()).is_none());
    }
}
