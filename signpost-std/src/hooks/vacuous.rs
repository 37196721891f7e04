//! A hook that does nothing.
//!
//! Useful for checking that a route's hook chain is wired up.

use signpost_core::{Hook, HookOutcome, Parameters};

/// Logs the context and declines to change it.
#[derive(Debug, Clone, Copy, Default)]
pub struct VacuousHook;

impl Hook for VacuousHook {
    async fn apply(&self, params: &Parameters) -> HookOutcome {
        tracing::debug!(?params, "vacuous hook called");
        HookOutcome::Unchanged
    }
}
