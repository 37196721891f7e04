//! # Hooks
//!
//! A hook is a named unit of pre-redirect work. It receives the current
//! [`Parameters`], may act against the lab environment through
//! [`Parameters::client`], and reports a [`HookOutcome`].
//!
//! # Static vs Dynamic Dispatch
//!
//! [`Hook`] uses native `async fn` so concrete hooks compose without boxing
//! (see the timeout wrapper in `signpost-std`). Registries and pipelines
//! store hooks as `Arc<dyn DynHook>`; every `Hook` is a `DynHook` through a
//! blanket implementation.

use crate::{context::Parameters, error::BoxError};
use std::{future::Future, pin::Pin, sync::Arc};

/// What a hook did with the context it was given.
#[derive(Debug)]
pub enum HookOutcome {
    /// The hook declined to change the context; it is carried forward as is.
    Unchanged,
    /// The hook produced a replacement context. Only `target` and
    /// `unique_id` may differ from the input.
    Replaced(Parameters),
    /// Like `Replaced`, but no further hooks run. When the redirect is
    /// rendered, `${path}` stands for the full request path rather than
    /// the part left after the route prefix.
    Finished(Parameters),
    /// The hook failed. No further hooks run.
    Failed(BoxError),
}

impl HookOutcome {
    /// Build a failed outcome from any error.
    pub fn failed(reason: impl Into<BoxError>) -> Self {
        HookOutcome::Failed(reason.into())
    }

    /// Whether the hook failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, HookOutcome::Failed(_))
    }

    /// Whether this outcome stops the chain.
    pub fn ends_chain(&self) -> bool {
        matches!(self, HookOutcome::Finished(_) | HookOutcome::Failed(_))
    }
}

/// A pre-redirect operation run against a request's [`Parameters`].
///
/// # Contract
///
/// - Return [`HookOutcome::Unchanged`] to leave the context alone.
/// - Return [`HookOutcome::Replaced`] with a context differing from the input
///   only in `target` and `unique_id`. Anything else is a policy violation.
/// - Return [`HookOutcome::Finished`] to replace the context and end the
///   chain, e.g. to send the user somewhere else entirely.
/// - Return [`HookOutcome::Failed`] when the work could not be done. Side
///   effects already performed are not rolled back.
///
/// Hooks should be idempotent: the usual case is building or fetching a file
/// in the user's lab without overwriting one that already exists.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a signpost `Hook`",
    label = "missing `Hook` implementation",
    note = "Hooks must implement `apply(&self, params: &Parameters) -> HookOutcome`."
)]
pub trait Hook: Send + Sync + 'static {
    /// Run the hook against `params`.
    fn apply(&self, params: &Parameters) -> impl Future<Output = HookOutcome> + Send;
}

/// Dynamic object-safe version of [`Hook`].
///
/// Use this trait when you need runtime polymorphism (e.g., in a registry).
pub trait DynHook: Send + Sync + 'static {
    /// Run the hook against `params` (dynamic dispatch version).
    fn apply_dyn<'a>(
        &'a self,
        params: &'a Parameters,
    ) -> Pin<Box<dyn Future<Output = HookOutcome> + Send + 'a>>;
}

// Blanket implementation: Any type implementing Hook implements DynHook automatically.
impl<T: Hook> DynHook for T {
    fn apply_dyn<'a>(
        &'a self,
        params: &'a Parameters,
    ) -> Pin<Box<dyn Future<Output = HookOutcome> + Send + 'a>> {
        Box::pin(self.apply(params))
    }
}

// Allow shared registry entries to be wrapped by static combinators.
impl Hook for Arc<dyn DynHook> {
    async fn apply(&self, params: &Parameters) -> HookOutcome {
        // Dispatch through the trait object, not the blanket impl on `Arc`.
        (**self).apply_dyn(params).await
    }
}

/// Conversion of a hook body's return value into a [`HookOutcome`].
///
/// # Default Implementations
///
/// - `HookOutcome` → As is
/// - `()` → Unchanged
/// - `Parameters` → Replaced
/// - `Option<T>` → `None` is Unchanged, `Some` delegates to `T`
/// - `Result<T, E>` → Delegates to `T` or fails with `E`
///
/// This lets hook bodies use `?` and still return an outcome:
///
/// ```rust,ignore
/// async fn apply(&self, params: &Parameters) -> HookOutcome {
///     self.run(params).await.into_outcome()
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be turned into a `HookOutcome`",
    label = "missing `IntoHookOutcome` implementation"
)]
pub trait IntoHookOutcome {
    /// Convert into a hook outcome.
    fn into_outcome(self) -> HookOutcome;
}

impl IntoHookOutcome for HookOutcome {
    fn into_outcome(self) -> HookOutcome {
        self
    }
}

impl IntoHookOutcome for () {
    fn into_outcome(self) -> HookOutcome {
        HookOutcome::Unchanged
    }
}

impl IntoHookOutcome for Parameters {
    fn into_outcome(self) -> HookOutcome {
        HookOutcome::Replaced(self)
    }
}

impl<T: IntoHookOutcome> IntoHookOutcome for Option<T> {
    fn into_outcome(self) -> HookOutcome {
        match self {
            Some(t) => t.into_outcome(),
            None => HookOutcome::Unchanged,
        }
    }
}

impl<T, E> IntoHookOutcome for Result<T, E>
where
    T: IntoHookOutcome,
    E: Into<BoxError>,
{
    fn into_outcome(self) -> HookOutcome {
        match self {
            Ok(t) => t.into_outcome(),
            Err(e) => HookOutcome::Failed(e.into()),
        }
    }
}
