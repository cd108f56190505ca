//! Scenario controller: the façade applications and devtools consume.
//!
//! `extend_handlers` groups a set of `HandlerBinding`s and exposes the
//! mutation surface: `use_mock`, `use_real_api`, `reset`, status snapshots,
//! change subscriptions, and profile creation.
//!
//! Every mutating call follows the same sequence: selection-registry write
//! (which also persists), then mocking-runtime re-registration, then
//! subscriber notification. Subscribers therefore never observe a selection
//! the runtime does not already serve.

use crate::endpoint::{EndpointKey, HttpMethod};
use crate::error::MockError;
use crate::handler::HandlerBinding;
use crate::preset::{Body, OverrideFn, Preset, DEFAULT_PRESET, DYNAMIC_PRESET, REAL_API_PRESET};
use crate::profile::{Profile, ProfileManager};
use crate::registry::{Registry, Selection, SelectionState};
use crate::runtime::{MockRuntime, NoopRuntime};
use crate::store::Subscription;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Arguments for `ScenarioController::use_mock`.
///
/// Built via `UseMock::preset` (select a registered preset by label) or
/// `UseMock::response` (ad-hoc body, selected as the transient `"dynamic"`
/// preset).
#[derive(Clone)]
pub struct UseMock {
    pub(crate) method: HttpMethod,
    pub(crate) path: String,
    pub(crate) target: MockTarget,
    pub(crate) status: Option<u16>,
    pub(crate) override_fn: Option<OverrideFn>,
}

#[derive(Clone)]
pub(crate) enum MockTarget {
    Preset(String),
    Response(Body),
}

impl UseMock {
    /// Select a registered preset by label.
    pub fn preset(
        method: HttpMethod,
        path: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            target: MockTarget::Preset(label.into()),
            status: None,
            override_fn: None,
        }
    }

    /// Select an ad-hoc response body, bypassing the registered preset
    /// list. Status defaults to 200.
    pub fn response(method: HttpMethod, path: impl Into<String>, body: Body) -> Self {
        Self {
            method,
            path: path.into(),
            target: MockTarget::Response(body),
            status: None,
            override_fn: None,
        }
    }

    /// Status for an ad-hoc response. Ignored for named presets, which
    /// carry their own status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Per-request patch applied to a draft copy of the resolved body.
    pub fn with_override(mut self, f: impl Fn(&mut Body) + Send + Sync + 'static) -> Self {
        self.override_fn = Some(Arc::new(f));
        self
    }
}

/// One endpoint's entry in a status listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStatus {
    pub method: HttpMethod,
    pub path: String,
    pub current_preset: String,
}

/// Payload pushed to `subscribe_to_changes` listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub status: Vec<EndpointStatus>,
    pub current_profile: Option<String>,
}

/// Group bindings into a controller against the global registry, with no
/// mocking runtime wired up.
pub fn extend_handlers(
    bindings: impl IntoIterator<Item = HandlerBinding>,
) -> ScenarioController {
    extend_handlers_with(
        bindings,
        Arc::clone(Registry::global()),
        Arc::new(NoopRuntime),
    )
}

/// Group bindings into a controller against an explicit registry and
/// mocking runtime.
pub fn extend_handlers_with(
    bindings: impl IntoIterator<Item = HandlerBinding>,
    registry: Arc<Registry>,
    runtime: Arc<dyn MockRuntime>,
) -> ScenarioController {
    let handlers: Vec<Arc<HandlerBinding>> = bindings.into_iter().map(Arc::new).collect();
    let controller = ScenarioController {
        handlers,
        registry,
        runtime,
    };
    controller.restore_persisted();
    if let Err(e) = controller.runtime.use_handlers(&controller.keys()) {
        warn!("mock runtime registration failed: {e:#}");
    }
    controller
}

/// Aggregates a group of handler bindings behind one mutation surface.
pub struct ScenarioController {
    handlers: Vec<Arc<HandlerBinding>>,
    registry: Arc<Registry>,
    runtime: Arc<dyn MockRuntime>,
}

impl ScenarioController {
    /// Select a preset (registered or ad-hoc) for one bound endpoint.
    pub fn use_mock(&self, request: UseMock) -> Result<(), MockError> {
        apply_selection(&self.handlers, &self.registry, request)?;
        self.sync_and_publish();
        Ok(())
    }

    /// Mark one bound endpoint as explicitly real: requests fall through to
    /// the default resolver, and the endpoint disappears from status
    /// listings, but the choice itself stays observable in the registry.
    pub fn use_real_api(&self, method: HttpMethod, path: &str) -> Result<(), MockError> {
        apply_real_api(&self.handlers, &self.registry, method, path)?;
        self.sync_and_publish();
        Ok(())
    }

    /// Point every bound endpoint back at its own default preset and clear
    /// the active profile.
    pub fn reset(&self) {
        for handler in &self.handlers {
            handler.reset_selection();
        }
        self.registry.selections.set_current_profile(None);
        self.sync_and_publish();
    }

    /// Snapshot of every bound endpoint's selection label. Endpoints with
    /// no selection report `"default"`; sentinel-marked endpoints are
    /// excluded.
    pub fn get_current_status(&self) -> Vec<EndpointStatus> {
        let state = self.registry.selections.snapshot();
        status_of(&self.keys(), &state)
    }

    /// Subscribe to selection changes among this controller's endpoints.
    /// The callback receives the scoped status plus the active profile.
    pub fn subscribe_to_changes(
        &self,
        callback: impl Fn(&StatusSnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        let keys = self.keys();
        self.registry.selections.subscribe(move |state| {
            let snapshot = StatusSnapshot {
                status: status_of(&keys, state),
                current_profile: state.current_profile.clone(),
            };
            callback(&snapshot);
        })
    }

    /// Build a profile manager scoped to this controller's handlers.
    pub fn create_mock_profiles(
        &self,
        profiles: impl IntoIterator<Item = Profile>,
    ) -> ProfileManager {
        ProfileManager::new(
            profiles,
            self.handlers.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.runtime),
        )
    }

    /// The binding for `(method, path)`, if bound. Dispatch glue uses this
    /// to route an intercepted request to `HandlerBinding::resolve`.
    pub fn handler(&self, method: HttpMethod, path: &str) -> Option<&Arc<HandlerBinding>> {
        self.handlers
            .iter()
            .find(|h| h.method() == method && h.path() == path)
    }

    fn keys(&self) -> Vec<EndpointKey> {
        self.handlers.iter().map(|h| h.key().clone()).collect()
    }

    /// Re-apply selections that survived a reload, dropping labels that no
    /// longer exist on the live preset lists.
    fn restore_persisted(&self) {
        for handler in &self.handlers {
            let Some(persisted) = self.registry.selections.take_persisted(handler.key()) else {
                continue;
            };
            if persisted.label == REAL_API_PRESET {
                debug!("restoring real-API selection for {}", handler.key());
                apply_real_api_selection(&self.registry, handler.key());
                continue;
            }
            match self
                .registry
                .presets
                .find_preset(handler.key(), &persisted.label)
            {
                Some(preset) => {
                    debug!(
                        "restoring persisted preset '{}' for {}",
                        persisted.label,
                        handler.key()
                    );
                    self.registry.selections.set_selected(
                        handler.method(),
                        handler.path(),
                        Selection::new(preset),
                    );
                }
                None => debug!(
                    "dropping stale persisted preset '{}' for {}",
                    persisted.label,
                    handler.key()
                ),
            }
        }
    }

    pub(crate) fn sync_and_publish(&self) {
        if let Err(e) = self.runtime.reset_handlers(&self.keys()) {
            warn!("mock runtime re-registration failed: {e:#}");
        }
        self.registry.selections.publish();
    }
}

/// Resolve and write one selection. Shared by the controller (which then
/// re-registers and publishes) and by profile application (which batches
/// those steps).
pub(crate) fn apply_selection(
    handlers: &[Arc<HandlerBinding>],
    registry: &Registry,
    request: UseMock,
) -> Result<(), MockError> {
    let handler = find_handler(handlers, request.method, &request.path)?;
    let preset = match &request.target {
        MockTarget::Response(body) => Preset::json(
            DYNAMIC_PRESET,
            request.status.unwrap_or(200),
            body.clone(),
        ),
        MockTarget::Preset(label) => registry
            .presets
            .find_preset(handler.key(), label)
            .ok_or_else(|| MockError::PresetNotFound(label.clone()))?,
    };
    debug!("selecting preset '{}' for {}", preset.label, handler.key());
    registry.selections.set_selected(
        request.method,
        &request.path,
        Selection {
            preset,
            override_fn: request.override_fn,
        },
    );
    Ok(())
}

/// Write the real-API sentinel selection for one bound endpoint.
pub(crate) fn apply_real_api(
    handlers: &[Arc<HandlerBinding>],
    registry: &Registry,
    method: HttpMethod,
    path: &str,
) -> Result<(), MockError> {
    let handler = find_handler(handlers, method, path)?;
    debug!("selecting real API for {}", handler.key());
    apply_real_api_selection(registry, handler.key());
    Ok(())
}

fn apply_real_api_selection(registry: &Registry, key: &EndpointKey) {
    registry.selections.set_selected(
        key.method,
        &key.path,
        Selection::new(Preset::json(REAL_API_PRESET, 200, Value::Null)),
    );
}

fn find_handler<'a>(
    handlers: &'a [Arc<HandlerBinding>],
    method: HttpMethod,
    path: &str,
) -> Result<&'a Arc<HandlerBinding>, MockError> {
    handlers
        .iter()
        .find(|h| h.method() == method && h.path() == path)
        .ok_or_else(|| MockError::HandlerNotFound {
            method,
            path: path.to_string(),
        })
}

pub(crate) fn status_of(keys: &[EndpointKey], state: &SelectionState) -> Vec<EndpointStatus> {
    keys.iter()
        .filter_map(|key| match state.selections.get(key) {
            Some(selection) if selection.preset.label == REAL_API_PRESET => None,
            Some(selection) => Some(EndpointStatus {
                method: key.method,
                path: key.path.clone(),
                current_preset: selection.preset.label.clone(),
            }),
            None => Some(EndpointStatus {
                method: key.method,
                path: key.path.clone(),
                current_preset: DEFAULT_PRESET.to_string(),
            }),
        })
        .collect()
}
