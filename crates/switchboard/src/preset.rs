//! Presets: named, canned responses attached to an endpoint.
//!
//! A preset pairs a label with an HTTP status and a body. The body is either
//! a literal JSON value or an async resolver invoked with the request
//! context. Presets are immutable once registered; extending an endpoint
//! appends new presets, it never mutates existing ones.

use crate::endpoint::HttpMethod;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Response body type. All bodies are JSON values.
pub type Body = Value;

/// Async body producer invoked with the matched request's context.
pub type ResponderFn = Arc<dyn Fn(RequestContext) -> BoxFuture<'static, Body> + Send + Sync>;

/// Per-request structural patch applied to a draft copy of a resolved body.
/// The stored preset is never modified; overrides are ephemeral.
pub type OverrideFn = Arc<dyn Fn(&mut Body) + Send + Sync>;

/// Label of the automatically injected preset backed by the endpoint's own
/// default resolver. Always present, always first.
pub const DEFAULT_PRESET: &str = "default";

/// Label synthesized for ad-hoc `use_mock` responses that bypass the
/// registered preset list.
pub const DYNAMIC_PRESET: &str = "dynamic";

/// Sentinel label marking "bypass mocking, defer to the real network".
/// Distinguished from "no selection" so that observability layers can tell
/// an explicit choice from an unconfigured endpoint. Excluded from every
/// status listing.
pub const REAL_API_PRESET: &str = "__REAL_API__";

/// Body of a preset: a literal value or an async resolver.
#[derive(Clone)]
pub enum PresetResponse {
    Static(Body),
    Dynamic(ResponderFn),
}

impl PresetResponse {
    /// Produce the body for one request.
    ///
    /// Always hands back an owned value: static bodies are cloned and
    /// dynamic resolvers build a fresh one, so callers may patch the result
    /// freely without touching the stored preset.
    pub async fn resolve(&self, ctx: RequestContext) -> Body {
        match self {
            PresetResponse::Static(body) => body.clone(),
            PresetResponse::Dynamic(f) => f(ctx).await,
        }
    }
}

impl fmt::Debug for PresetResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetResponse::Static(body) => f.debug_tuple("Static").field(body).finish(),
            PresetResponse::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// A named, canned response for one endpoint.
#[derive(Debug, Clone)]
pub struct Preset {
    pub label: String,
    pub status: u16,
    pub response: PresetResponse,
}

impl Preset {
    /// Preset with a literal JSON body.
    pub fn json(label: impl Into<String>, status: u16, body: Body) -> Self {
        Self {
            label: label.into(),
            status,
            response: PresetResponse::Static(body),
        }
    }

    /// Preset whose body is produced per request by an async resolver.
    pub fn resolver<F, Fut>(label: impl Into<String>, status: u16, f: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Body> + Send + 'static,
    {
        Self {
            label: label.into(),
            status,
            response: PresetResponse::Dynamic(Arc::new(move |ctx| f(ctx).boxed())),
        }
    }

    /// Labels claimed by the engine itself; user presets may not use them.
    pub fn is_reserved_label(label: &str) -> bool {
        label == DEFAULT_PRESET || label == DYNAMIC_PRESET || label == REAL_API_PRESET
    }
}

/// Context handed to dynamic resolvers for one matched request.
///
/// Built by the mocking runtime's dispatch glue; the builder methods exist
/// mainly for tests and examples.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: HttpMethod,
    pub path: String,
    /// Path parameters extracted by the runtime's pattern matcher.
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Option<Body>,
}

impl RequestContext {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: HashMap::new(),
            query: HashMap::new(),
            cookies: HashMap::new(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }
}

/// The resolved answer for one request: status, headers, JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Body,
}

impl MockResponse {
    pub fn json(status: u16, body: Body) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        Self {
            status,
            headers,
            body,
        }
    }

    /// Serialized body, for collaborators that want raw bytes.
    pub fn body_string(&self) -> String {
        self.body.to_string()
    }
}
