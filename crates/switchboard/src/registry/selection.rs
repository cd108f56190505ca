//! Current selections: which preset answers each endpoint right now.
//!
//! One `Selection` exists per endpoint key at most. Absence means "answer
//! with the endpoint's default resolver". Mutations here are silent; the
//! façade that owns the mutation re-registers the mocking runtime's handler
//! set first and then calls `publish`, so no subscriber ever observes a
//! state the runtime does not yet reflect.

use crate::endpoint::{EndpointKey, HttpMethod};
use crate::persistence::DurableStore;
use crate::preset::{OverrideFn, Preset};
use crate::store::{KeyedStore, Persistence, Subscription};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// The currently active preset for one endpoint, plus an optional
/// per-request body patch.
#[derive(Clone)]
pub struct Selection {
    pub preset: Preset,
    pub override_fn: Option<OverrideFn>,
}

impl Selection {
    pub fn new(preset: Preset) -> Self {
        Self {
            preset,
            override_fn: None,
        }
    }

    pub fn with_override(preset: Preset, override_fn: OverrideFn) -> Self {
        Self {
            preset,
            override_fn: Some(override_fn),
        }
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("preset", &self.preset)
            .field("override", &self.override_fn.is_some())
            .finish()
    }
}

/// Full selection state: per-endpoint selections plus the active profile.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    pub selections: HashMap<EndpointKey, Selection>,
    pub current_profile: Option<String>,
}

/// Serializable projection of one selection. Function responses and
/// overrides are not serializable and are dropped deliberately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSelection {
    pub label: String,
    pub status: u16,
}

/// On-medium shape of the selection state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
    #[serde(default)]
    selections: HashMap<String, PersistedSelection>,
    #[serde(default)]
    current_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<String>,
}

impl PersistedState {
    fn project(state: &SelectionState) -> Self {
        Self {
            selections: state
                .selections
                .iter()
                .map(|(key, selection)| {
                    (
                        key.to_string(),
                        PersistedSelection {
                            label: selection.preset.label.clone(),
                            status: selection.preset.status,
                        },
                    )
                })
                .collect(),
            current_profile: state.current_profile.clone(),
            saved_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}

/// Stores the currently selected preset per endpoint and the active profile
/// name; persists a projection to the durable medium on every change.
pub struct SelectionRegistry {
    store: KeyedStore<SelectionState>,
    /// Labels rehydrated from the medium. Stale until cross-checked against
    /// live-registered presets; consumed one key at a time via
    /// `take_persisted`.
    persisted: Mutex<HashMap<EndpointKey, PersistedSelection>>,
}

impl SelectionRegistry {
    /// Registry without durable persistence.
    pub fn new() -> Self {
        Self {
            store: KeyedStore::new(SelectionState::default()),
            persisted: Mutex::new(HashMap::new()),
        }
    }

    /// Registry persisting to `medium` under `storage_key`.
    ///
    /// Persisted selections cannot be rebuilt into live `Selection` values
    /// here (responses may be functions, and a label may no longer exist),
    /// so they are held aside as a stale snapshot for the controller to
    /// cross-check and re-apply.
    pub fn with_medium(medium: Arc<dyn DurableStore>, storage_key: &str) -> Self {
        let mut persisted = HashMap::new();
        let mut current_profile = None;
        match medium.get_item(storage_key) {
            Ok(Some(raw)) => match serde_json::from_str::<PersistedState>(&raw) {
                Ok(state) => {
                    current_profile = state.current_profile;
                    for (rendered, selection) in state.selections {
                        match EndpointKey::parse(&rendered) {
                            Some(key) => {
                                persisted.insert(key, selection);
                            }
                            None => warn!("discarding unparseable persisted key '{rendered}'"),
                        }
                    }
                }
                Err(e) => warn!("discarding undecodable persisted selections: {e}"),
            },
            Ok(None) => {}
            Err(e) => warn!("failed to read persisted selections: {e:#}"),
        }

        let store = KeyedStore::with_persistence(
            SelectionState {
                selections: HashMap::new(),
                current_profile,
            },
            Persistence {
                key: storage_key.to_string(),
                medium,
                encode: Arc::new(|state: &SelectionState| {
                    serde_json::to_string(&PersistedState::project(state)).ok()
                }),
                decode: None,
            },
        );
        Self {
            store,
            persisted: Mutex::new(persisted),
        }
    }

    /// Upsert the selection for `(method, path)`. Atomic with respect to
    /// readers; does not notify (see module docs).
    pub fn set_selected(&self, method: HttpMethod, path: &str, selection: Selection) {
        let key = EndpointKey::new(method, path);
        self.store.update_silent(|state| {
            state.selections.insert(key, selection);
        });
    }

    /// Cloned snapshot of the selection for `(method, path)`. An in-flight
    /// resolution keeps the snapshot it read; later mutations never alter
    /// it.
    pub fn get_selected(&self, method: HttpMethod, path: &str) -> Option<Selection> {
        let key = EndpointKey::new(method, path);
        self.store.read(|state| state.selections.get(&key).cloned())
    }

    /// Delete one endpoint's selection.
    pub fn clear_selected(&self, method: HttpMethod, path: &str) {
        let key = EndpointKey::new(method, path);
        self.store.update_silent(|state| {
            state.selections.remove(&key);
        });
    }

    /// Delete every selection and reset the active profile. Profile identity
    /// is meaningless once selections are wiped, so the two clear together.
    pub fn clear_all(&self) {
        self.store.update_silent(|state| {
            state.selections.clear();
            state.current_profile = None;
        });
    }

    pub fn set_current_profile(&self, name: Option<String>) {
        self.store.update_silent(|state| {
            state.current_profile = name;
        });
    }

    pub fn get_current_profile(&self) -> Option<String> {
        self.store.read(|state| state.current_profile.clone())
    }

    /// Cloned snapshot of the full state.
    pub fn snapshot(&self) -> SelectionState {
        self.store.get_state()
    }

    /// Subscribe to published state changes.
    pub fn subscribe(
        &self,
        listener: impl Fn(&SelectionState) + Send + Sync + 'static,
    ) -> Subscription {
        self.store.subscribe(listener)
    }

    /// Notify subscribers of the current state. Called by the mutation owner
    /// after the mocking runtime has been re-registered.
    pub fn publish(&self) {
        self.store.notify_listeners();
    }

    /// Consume the rehydrated (stale) selection for `key`, if any.
    pub fn take_persisted(&self, key: &EndpointKey) -> Option<PersistedSelection> {
        self.persisted.lock().remove(key)
    }
}

impl Default for SelectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::InMemoryStore;
    use crate::preset::REAL_API_PRESET;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn preset(label: &str, status: u16) -> Preset {
        Preset::json(label, status, json!({}))
    }

    #[test]
    fn test_set_get_clear_one() {
        let registry = SelectionRegistry::new();
        registry.set_selected(HttpMethod::Get, "/api/users", Selection::new(preset("empty", 200)));

        let selection = registry.get_selected(HttpMethod::Get, "/api/users").unwrap();
        assert_eq!(selection.preset.label, "empty");
        assert!(registry.get_selected(HttpMethod::Post, "/api/users").is_none());

        registry.clear_selected(HttpMethod::Get, "/api/users");
        assert!(registry.get_selected(HttpMethod::Get, "/api/users").is_none());
    }

    #[test]
    fn test_upsert_replaces_existing_selection() {
        let registry = SelectionRegistry::new();
        registry.set_selected(HttpMethod::Get, "/a", Selection::new(preset("one", 200)));
        registry.set_selected(HttpMethod::Get, "/a", Selection::new(preset("two", 500)));

        let selection = registry.get_selected(HttpMethod::Get, "/a").unwrap();
        assert_eq!(selection.preset.label, "two");
        assert_eq!(registry.snapshot().selections.len(), 1);
    }

    #[test]
    fn test_clear_all_also_resets_profile() {
        let registry = SelectionRegistry::new();
        registry.set_selected(HttpMethod::Get, "/a", Selection::new(preset("one", 200)));
        registry.set_current_profile(Some("Empty State".to_string()));

        registry.clear_all();
        assert!(registry.get_selected(HttpMethod::Get, "/a").is_none());
        assert!(registry.get_current_profile().is_none());
    }

    #[test]
    fn test_publish_is_explicit() {
        let registry = SelectionRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _sub = registry.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.set_selected(HttpMethod::Get, "/a", Selection::new(preset("one", 200)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        registry.publish();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_persisted_projection_skips_functions() {
        let medium = Arc::new(InMemoryStore::new());
        let registry =
            SelectionRegistry::with_medium(Arc::clone(&medium) as Arc<dyn DurableStore>, "sb.test");

        let resolver = Preset::resolver("live", 200, |_ctx| async { json!({"from": "fn"}) });
        registry.set_selected(HttpMethod::Get, "/api/users", Selection::new(resolver));
        registry.set_current_profile(Some("Primary".to_string()));

        let raw = medium.get_item("sb.test").unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["selections"]["get /api/users"]["label"], "live");
        assert_eq!(parsed["selections"]["get /api/users"]["status"], 200);
        assert_eq!(parsed["currentProfile"], "Primary");
        // Only label and status survive; the resolver body is gone.
        assert!(parsed["selections"]["get /api/users"].get("response").is_none());
    }

    #[test]
    fn test_rehydrated_selections_are_held_stale() {
        let medium = Arc::new(InMemoryStore::new());
        {
            let registry = SelectionRegistry::with_medium(
                Arc::clone(&medium) as Arc<dyn DurableStore>,
                "sb.test",
            );
            registry.set_selected(HttpMethod::Get, "/api/users", Selection::new(preset("empty", 200)));
            registry.set_selected(
                HttpMethod::Get,
                "/api/real",
                Selection::new(preset(REAL_API_PRESET, 200)),
            );
        }

        let reloaded =
            SelectionRegistry::with_medium(Arc::clone(&medium) as Arc<dyn DurableStore>, "sb.test");
        // Nothing is live until the controller cross-checks and re-applies.
        assert!(reloaded.get_selected(HttpMethod::Get, "/api/users").is_none());

        let key = EndpointKey::new(HttpMethod::Get, "/api/users");
        let persisted = reloaded.take_persisted(&key).unwrap();
        assert_eq!(persisted.label, "empty");
        // Consumed: a second take finds nothing.
        assert!(reloaded.take_persisted(&key).is_none());
    }

    #[test]
    fn test_corrupt_persisted_payload_is_discarded() {
        let medium = Arc::new(InMemoryStore::new());
        medium.set_item("sb.test", "{not json").unwrap();

        let registry =
            SelectionRegistry::with_medium(Arc::clone(&medium) as Arc<dyn DurableStore>, "sb.test");
        assert!(registry.snapshot().selections.is_empty());
        assert!(registry.get_current_profile().is_none());
    }
}
