//! Error types for selection and profile operations.
//!
//! Only programmer errors surface here: referencing an endpoint, preset, or
//! profile that was never declared. Infrastructure failures (durable-medium
//! writes, subscriber panics, runtime re-registration) are logged and
//! recovered locally; they never reach the caller of a mutation.

use crate::endpoint::HttpMethod;

/// Error types for mock selection operations.
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    #[error("Handler not found: {method} {path}")]
    HandlerNotFound { method: HttpMethod, path: String },
    #[error("Preset not found: {0}")]
    PresetNotFound(String),
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
}
