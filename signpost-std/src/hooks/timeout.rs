//! Timeout hook for time-limited execution.

use signpost_core::{Hook, HookError, HookOutcome, Parameters};
use std::time::Duration;
use tokio::time::timeout;

/// A hook that wraps another hook with a timeout.
///
/// When the inner hook does not finish within `duration` it is dropped and
/// the outcome is a failure carrying [`HookError::Timeout`]. Side effects
/// the inner hook already started are not undone.
pub struct TimeoutHook<H> {
    inner: H,
    duration: Duration,
}

impl<H> TimeoutHook<H> {
    /// Create a new timeout hook.
    pub fn new(inner: H, duration: Duration) -> Self {
        Self { inner, duration }
    }

    /// The time budget.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl<H: Hook> Hook for TimeoutHook<H> {
    async fn apply(&self, params: &Parameters) -> HookOutcome {
        match timeout(self.duration, self.inner.apply(params)).await {
            Ok(outcome) => outcome,
            Err(_) => HookOutcome::failed(HookError::Timeout(self.duration)),
        }
    }
}
