//! Per-method declaration helpers against the global registry.
//!
//! ```no_run
//! use serde_json::json;
//! use switchboard::http;
//!
//! let users = http::get("/api/users", |_ctx| async { json!({"users": []}) });
//! ```

use crate::endpoint::HttpMethod;
use crate::handler::HandlerBinding;
use crate::preset::{Body, RequestContext};
use crate::registry::Registry;
use std::future::Future;

macro_rules! method_helper {
    ($name:ident, $method:expr) => {
        pub fn $name<F, Fut>(path: impl Into<String>, resolver: F) -> HandlerBinding
        where
            F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Body> + Send + 'static,
        {
            HandlerBinding::new(Registry::global(), $method, path, resolver)
        }
    };
}

method_helper!(get, HttpMethod::Get);
method_helper!(post, HttpMethod::Post);
method_helper!(put, HttpMethod::Put);
method_helper!(delete, HttpMethod::Delete);
method_helper!(patch, HttpMethod::Patch);
method_helper!(options, HttpMethod::Options);
method_helper!(head, HttpMethod::Head);
method_helper!(all, HttpMethod::All);
