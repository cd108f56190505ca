//! Handler bindings: one mockable endpoint each.
//!
//! A `HandlerBinding` wraps a `(method, path, default resolver)` triple.
//! Construction registers the default preset as the zeroth entry of the
//! endpoint's preset list; `presets`/`add_preset` extend that list. At
//! request time the binding consults the selection registry and either
//! answers from the selected preset or falls through to its own resolver.
//!
//! Extending a binding returns the extended value, but identity lives in
//! the endpoint key, not the Rust value: selections made against the key
//! stay valid across extension.

use crate::endpoint::{EndpointKey, HttpMethod};
use crate::preset::{
    Body, MockResponse, Preset, RequestContext, DEFAULT_PRESET, REAL_API_PRESET,
};
use crate::registry::{Registry, Selection};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// One logical endpoint bound to a registry.
pub struct HandlerBinding {
    key: EndpointKey,
    registry: Arc<Registry>,
    default_preset: Preset,
}

impl HandlerBinding {
    /// Bind `(method, path)` to `resolver` against `registry`.
    ///
    /// The resolver becomes the `"default"` preset (status 200), always
    /// first in the endpoint's preset list.
    pub fn new<F, Fut>(
        registry: &Arc<Registry>,
        method: HttpMethod,
        path: impl Into<String>,
        resolver: F,
    ) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Body> + Send + 'static,
    {
        let key = EndpointKey::new(method, path);
        let default_preset = Preset::resolver(DEFAULT_PRESET, 200, resolver);
        registry
            .presets
            .set_presets(key.clone(), vec![default_preset.clone()]);
        debug!("bound handler {key}");
        Self {
            key,
            registry: Arc::clone(registry),
            default_preset,
        }
    }

    /// Append presets at declaration time. Chainable.
    pub fn presets(self, presets: impl IntoIterator<Item = Preset>) -> Self {
        self.registry
            .presets
            .append_presets(&self.key, presets.into_iter().collect());
        self
    }

    /// Append one preset after declaration.
    pub fn add_preset(&self, preset: Preset) {
        self.registry.presets.append_presets(&self.key, vec![preset]);
    }

    pub fn key(&self) -> &EndpointKey {
        &self.key
    }

    pub fn method(&self) -> HttpMethod {
        self.key.method
    }

    pub fn path(&self) -> &str {
        &self.key.path
    }

    /// The preset currently selected for this endpoint. `None` when nothing
    /// is selected or when the real-API sentinel is active.
    pub fn get_current_preset(&self) -> Option<Preset> {
        let selection = self
            .registry
            .selections
            .get_selected(self.key.method, &self.key.path)?;
        if selection.preset.label == REAL_API_PRESET {
            return None;
        }
        Some(selection.preset)
    }

    /// Point the selection back at the `"default"` preset.
    ///
    /// Distinct from clearing: afterwards a selection record exists with
    /// label `"default"`.
    pub fn reset(&self) {
        self.reset_selection();
        self.registry.selections.publish();
    }

    /// Selection write for `reset` without the notification; batch
    /// operations (controller/profile reset) re-register the runtime first
    /// and publish once.
    pub(crate) fn reset_selection(&self) {
        self.registry.selections.set_selected(
            self.key.method,
            &self.key.path,
            Selection::new(self.default_preset.clone()),
        );
    }

    /// Answer one request dispatched to this endpoint by the mocking
    /// runtime.
    pub async fn resolve(&self, ctx: RequestContext) -> MockResponse {
        let selection = self
            .registry
            .selections
            .get_selected(self.key.method, &self.key.path);

        let selection = match selection {
            None => return self.resolve_default(ctx).await,
            Some(s) if s.preset.label == REAL_API_PRESET => {
                return self.resolve_default(ctx).await
            }
            Some(s) => s,
        };

        // `resolve` hands back an owned copy, so patching it never touches
        // the stored preset.
        let mut body = selection.preset.response.resolve(ctx).await;
        if let Some(patch) = &selection.override_fn {
            patch(&mut body);
        }
        MockResponse::json(selection.preset.status, body)
    }

    async fn resolve_default(&self, ctx: RequestContext) -> MockResponse {
        let body = self.default_preset.response.resolve(ctx).await;
        MockResponse::json(self.default_preset.status, body)
    }
}
