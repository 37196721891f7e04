//! # Hook Pipeline
//!
//! Runs a route's hooks strictly in declared order, threading the
//! [`Parameters`] through them.
//!
//! After each hook the pipeline checks the outcome:
//!
//! - `Unchanged` carries the input forward.
//! - `Replaced` is accepted only if no immutable field changed; otherwise the
//!   chain stops with [`ResolveError::PolicyViolation`].
//! - `Finished` is checked like `Replaced` and then ends the chain early.
//! - `Failed` stops the chain with [`ResolveError::HookFailed`].
//!
//! There is no retry and no rollback of side effects already performed.

use signpost_core::{DynHook, Hook, HookOutcome, Parameters, ResolveError};
use std::{fmt, sync::Arc};
use tracing::{Instrument, debug, info_span, warn};

/// A hook paired with the name it was configured under.
#[derive(Clone)]
pub struct BoundHook {
    name: String,
    hook: Arc<dyn DynHook>,
}

impl BoundHook {
    /// Bind `hook` to `name`.
    pub fn new(name: impl Into<String>, hook: Arc<dyn DynHook>) -> Self {
        Self {
            name: name.into(),
            hook,
        }
    }

    /// Name reported in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for BoundHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoundHook").field(&self.name).finish()
    }
}

/// How a pipeline run came to an end.
#[derive(Debug)]
pub enum Completion {
    /// Every hook ran.
    Exhausted(Parameters),
    /// A hook returned [`HookOutcome::Finished`]; later hooks were skipped.
    Finished {
        /// Name of the hook that ended the chain.
        hook: String,
        /// The context it produced.
        params: Parameters,
    },
}

impl Completion {
    /// The final context, however the run ended.
    pub fn into_params(self) -> Parameters {
        match self {
            Completion::Exhausted(params) | Completion::Finished { params, .. } => params,
        }
    }

    /// Whether a hook ended the chain early.
    pub fn is_finished(&self) -> bool {
        matches!(self, Completion::Finished { .. })
    }
}

/// An ordered chain of hooks.
#[derive(Clone, Debug, Default)]
pub struct HookPipeline {
    hooks: Vec<BoundHook>,
}

impl HookPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook.
    pub fn with<H: Hook>(self, name: impl Into<String>, hook: H) -> Self {
        self.with_dyn(name, Arc::new(hook))
    }

    /// Append an already shared hook.
    pub fn with_dyn(mut self, name: impl Into<String>, hook: Arc<dyn DynHook>) -> Self {
        self.hooks.push(BoundHook::new(name, hook));
        self
    }

    /// Hook names in run order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.hooks.iter().map(BoundHook::name)
    }

    /// Number of hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether the pipeline has no hooks.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook in order and return the final context.
    pub async fn run(&self, params: Parameters) -> Result<Parameters, ResolveError> {
        self.execute(params).await.map(Completion::into_params)
    }

    /// Run the hooks in order, reporting whether one ended the chain early.
    pub async fn execute(&self, params: Parameters) -> Result<Completion, ResolveError> {
        let mut current = params;

        for bound in &self.hooks {
            let span = info_span!("hook", hook = %bound.name);
            let outcome = bound.hook.as_ref().apply_dyn(&current).instrument(span).await;

            match outcome {
                HookOutcome::Unchanged => {
                    debug!(hook = %bound.name, "hook left parameters unchanged");
                }
                HookOutcome::Replaced(next) => {
                    check_boundary(&bound.name, &current, &next)?;
                    debug!(
                        hook = %bound.name,
                        new_target = %next.target,
                        unique_id = ?next.unique_id,
                        "hook replaced parameters"
                    );
                    current = next;
                }
                HookOutcome::Finished(next) => {
                    check_boundary(&bound.name, &current, &next)?;
                    debug!(hook = %bound.name, new_target = %next.target, "hook ended the chain");
                    return Ok(Completion::Finished {
                        hook: bound.name.clone(),
                        params: next,
                    });
                }
                HookOutcome::Failed(reason) => {
                    warn!(hook = %bound.name, user = %current.user, error = %reason, "hook failed");
                    return Err(ResolveError::HookFailed {
                        hook: bound.name.clone(),
                        reason,
                    });
                }
            }
        }

        Ok(Completion::Exhausted(current))
    }
}

fn check_boundary(hook: &str, current: &Parameters, next: &Parameters) -> Result<(), ResolveError> {
    let changed = current.changed_immutable_fields(next);
    if changed.is_empty() {
        return Ok(());
    }
    warn!(
        hook,
        user = %current.user,
        fields = ?changed,
        "hook attempted to change immutable parameters"
    );
    Err(ResolveError::PolicyViolation {
        hook: hook.to_string(),
        fields: changed,
    })
}
