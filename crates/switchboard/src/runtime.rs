//! Interface to the HTTP-mocking collaborator.
//!
//! The engine never intercepts requests itself; an external runtime (an
//! in-process mock server or a browser-side intercepting worker) does. Both
//! modes expose the same two operations abstractly: install a handler set,
//! and re-register it after a change. Runtime failures are infrastructure
//! hiccups: the caller logs them and the mutation proceeds.

use crate::endpoint::EndpointKey;
use anyhow::Result;
use parking_lot::Mutex;

/// Backend-agnostic interface to the mocking runtime.
pub trait MockRuntime: Send + Sync {
    /// Install the handler set for the given endpoints.
    fn use_handlers(&self, active: &[EndpointKey]) -> Result<()>;

    /// Re-register the active handler set after a selection change.
    fn reset_handlers(&self, active: &[EndpointKey]) -> Result<()>;
}

/// Runtime that does nothing. Used when no collaborator is wired up, e.g.
/// in unit tests that only exercise selection state.
#[derive(Debug, Default)]
pub struct NoopRuntime;

impl MockRuntime for NoopRuntime {
    fn use_handlers(&self, _active: &[EndpointKey]) -> Result<()> {
        Ok(())
    }

    fn reset_handlers(&self, _active: &[EndpointKey]) -> Result<()> {
        Ok(())
    }
}

/// One recorded collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    Use(Vec<EndpointKey>),
    Reset(Vec<EndpointKey>),
}

/// Test double that records every call in order. Ordering-guarantee tests
/// assert against it.
#[derive(Debug, Default)]
pub struct RecordingRuntime {
    calls: Mutex<Vec<RuntimeCall>>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl MockRuntime for RecordingRuntime {
    fn use_handlers(&self, active: &[EndpointKey]) -> Result<()> {
        self.calls.lock().push(RuntimeCall::Use(active.to_vec()));
        Ok(())
    }

    fn reset_handlers(&self, active: &[EndpointKey]) -> Result<()> {
        self.calls.lock().push(RuntimeCall::Reset(active.to_vec()));
        Ok(())
    }
}
