//! Endpoint identity: HTTP method plus path.
//!
//! An `EndpointKey` is the unique identity of one mockable route. Paths are
//! compared by exact string match; placeholder-aware pattern matching is the
//! job of the mocking runtime that dispatches requests to us.

use crate::error::MockError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of supported HTTP methods.
///
/// Parsing is case-insensitive; the canonical rendering is lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    /// Matches any method; useful for catch-all endpoints.
    All,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::All => "all",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = MockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            "put" => Ok(HttpMethod::Put),
            "delete" => Ok(HttpMethod::Delete),
            "patch" => Ok(HttpMethod::Patch),
            "options" => Ok(HttpMethod::Options),
            "head" => Ok(HttpMethod::Head),
            "all" => Ok(HttpMethod::All),
            other => Err(MockError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Unique identity for one logical endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointKey {
    pub method: HttpMethod,
    pub path: String,
}

impl EndpointKey {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    /// Parse the `Display` form back into a key, e.g. `"get /api/users"`.
    ///
    /// Used when rehydrating persisted selection snapshots, where keys are
    /// stored as JSON map keys in this form.
    pub fn parse(s: &str) -> Option<Self> {
        let (method, path) = s.split_once(' ')?;
        let method = method.parse().ok()?;
        if path.is_empty() {
            return None;
        }
        Some(Self::new(method, path))
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}
