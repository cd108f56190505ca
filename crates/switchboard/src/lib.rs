//! Switchboard: runtime preset selection for HTTP-mocked endpoints.
//!
//! Declare an endpoint once, attach named presets, and switch at runtime
//! which preset (or the real network) answers matching requests. Request
//! interception itself belongs to an external mocking runtime; this crate
//! owns the selection state, its ordering guarantees, and the subscription
//! surface that devtools panels consume.
//!
//! ```no_run
//! use serde_json::json;
//! use switchboard::{extend_handlers, http, Preset, UseMock};
//! use switchboard::endpoint::HttpMethod;
//!
//! let users = http::get("/api/users", |_ctx| async { json!({"users": []}) })
//!     .presets([
//!         Preset::json("withUsers", 200, json!({"users": [{"id": 1, "name": "John"}]})),
//!         Preset::json("error", 500, json!({"message": "boom"})),
//!     ]);
//!
//! let api = extend_handlers([users]);
//! api.use_mock(UseMock::preset(HttpMethod::Get, "/api/users", "withUsers"))?;
//! # Ok::<(), switchboard::MockError>(())
//! ```

// ===== Core selection engine =====
pub mod endpoint;
pub mod error;
pub mod handler;
pub mod http;
pub mod preset;
pub mod profile;
pub mod registry;
pub mod runtime;
pub mod scenario;
pub mod store;

// ===== Ambient infrastructure =====
pub mod backends;
pub mod config;
pub mod persistence;

pub use error::MockError;
pub use handler::HandlerBinding;
pub use preset::{Body, MockResponse, Preset, RequestContext};
pub use profile::{Profile, ProfileContext, ProfileManager};
pub use registry::Registry;
pub use scenario::{
    extend_handlers, extend_handlers_with, EndpointStatus, ScenarioController, StatusSnapshot,
    UseMock,
};
pub use store::{KeyedStore, Subscription};
