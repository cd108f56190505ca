//! Named profiles: bundles of selections applied atomically.
//!
//! A profile's actions run against scoped `use_mock`/`use_real_api` that
//! write selections without publishing; re-registration and notification
//! happen exactly once, after the whole bundle has been applied. Switching
//! from profile A to profile B first resets every bound endpoint to its
//! default, so endpoints configured only under A revert cleanly.

use crate::endpoint::{EndpointKey, HttpMethod};
use crate::error::MockError;
use crate::handler::HandlerBinding;
use crate::registry::Registry;
use crate::runtime::MockRuntime;
use crate::scenario::{apply_real_api, apply_selection, UseMock};
use crate::store::{KeyedStore, Subscription};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

type ProfileActions = Arc<dyn Fn(&ProfileContext) -> Result<(), MockError> + Send + Sync>;

/// A named, ordered bundle of selection mutations.
#[derive(Clone)]
pub struct Profile {
    name: String,
    actions: ProfileActions,
}

impl Profile {
    pub fn new(
        name: impl Into<String>,
        actions: impl Fn(&ProfileContext) -> Result<(), MockError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            actions: Arc::new(actions),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile").field("name", &self.name).finish()
    }
}

/// Scoped mutation surface handed to a profile's actions.
pub struct ProfileContext {
    handlers: Vec<Arc<HandlerBinding>>,
    registry: Arc<Registry>,
}

impl ProfileContext {
    /// Select a preset for one bound endpoint. Takes effect when the
    /// surrounding profile application publishes.
    pub fn use_mock(&self, request: UseMock) -> Result<(), MockError> {
        apply_selection(&self.handlers, &self.registry, request)
    }

    /// Mark one bound endpoint as explicitly real.
    pub fn use_real_api(&self, method: HttpMethod, path: &str) -> Result<(), MockError> {
        apply_real_api(&self.handlers, &self.registry, method, path)
    }
}

/// Applies named profiles to a controller's handlers.
///
/// Two states: no profile active (initial) and one profile active. `reset`
/// returns to the initial state.
pub struct ProfileManager {
    profiles: Vec<Profile>,
    handlers: Vec<Arc<HandlerBinding>>,
    registry: Arc<Registry>,
    runtime: Arc<dyn MockRuntime>,
    /// Mirrors the active profile name purely for subscriber notification;
    /// the authoritative value lives in the selection registry.
    profile_cell: KeyedStore<Option<String>>,
}

impl ProfileManager {
    pub(crate) fn new(
        profiles: impl IntoIterator<Item = Profile>,
        handlers: Vec<Arc<HandlerBinding>>,
        registry: Arc<Registry>,
        runtime: Arc<dyn MockRuntime>,
    ) -> Self {
        let mut deduped: Vec<Profile> = Vec::new();
        for profile in profiles {
            if deduped.iter().any(|p| p.name == profile.name) {
                warn!("skipping duplicate profile '{}'", profile.name);
                continue;
            }
            deduped.push(profile);
        }
        Self {
            profiles: deduped,
            handlers,
            registry,
            runtime,
            profile_cell: KeyedStore::new(None),
        }
    }

    /// Apply the named profile: reset every bound endpoint to default, mark
    /// the profile active, run its actions, then re-register the runtime
    /// and notify status and profile subscribers.
    pub fn use_mock(&self, name: &str) -> Result<(), MockError> {
        let profile = self
            .profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| MockError::ProfileNotFound(name.to_string()))?
            .clone();

        debug!("applying profile '{name}'");
        for handler in &self.handlers {
            handler.reset_selection();
        }
        self.registry
            .selections
            .set_current_profile(Some(name.to_string()));

        let ctx = ProfileContext {
            handlers: self.handlers.clone(),
            registry: Arc::clone(&self.registry),
        };
        if let Err(e) = (profile.actions)(&ctx) {
            warn!("profile '{name}' actions failed: {e}; reverting to defaults");
            for handler in &self.handlers {
                handler.reset_selection();
            }
            self.registry.selections.set_current_profile(None);
            self.sync_and_publish();
            self.profile_cell.set_state(None);
            return Err(e);
        }

        self.sync_and_publish();
        self.profile_cell.set_state(Some(name.to_string()));
        Ok(())
    }

    /// Profile names in declaration order.
    pub fn get_available_profiles(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.name.clone()).collect()
    }

    pub fn get_current_profile(&self) -> Option<String> {
        self.registry.selections.get_current_profile()
    }

    /// Back to the initial state: every endpoint at its default preset, no
    /// profile active, profile subscribers notified with `None`.
    pub fn reset(&self) {
        for handler in &self.handlers {
            handler.reset_selection();
        }
        self.registry.selections.set_current_profile(None);
        self.sync_and_publish();
        self.profile_cell.set_state(None);
    }

    /// Subscribe to profile activations. Fires once per `use_mock`/`reset`,
    /// after the bundle has been fully applied.
    pub fn subscribe_to_changes(
        &self,
        callback: impl Fn(Option<&str>) + Send + Sync + 'static,
    ) -> Subscription {
        self.profile_cell
            .subscribe(move |name: &Option<String>| callback(name.as_deref()))
    }

    fn sync_and_publish(&self) {
        let keys: Vec<EndpointKey> = self.handlers.iter().map(|h| h.key().clone()).collect();
        if let Err(e) = self.runtime.reset_handlers(&keys) {
            warn!("mock runtime re-registration failed: {e:#}");
        }
        self.registry.selections.publish();
    }
}
