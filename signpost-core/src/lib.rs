//! # signpost-core
//!
//! Core types and traits for the signpost redirect engine.
//!
//! This crate has minimal dependencies and is meant to be imported by hook
//! implementations that don't need the routing and pipeline machinery in
//! `signpost-std`.
//!
//! # Building Blocks
//!
//! - [`Parameters`]: the per-request context threaded through a hook chain.
//!   Only `target` and `unique_id` may change between hooks.
//! - [`Hook`] / [`DynHook`]: a named unit of pre-redirect work returning a
//!   [`HookOutcome`].
//! - [`LabClient`] / [`LabClientFactory`]: the capability hooks use to act
//!   in the user's lab environment.
//!
//! # Error Types
//!
//! - [`ResolveError`] - Per-request failures, classified by [`FailureKind`]
//! - [`ConfigError`] - Load-time failures
//! - [`ClientError`] - Lab environment failures
//! - [`HookError`] - Standard hook failure reasons
//! - [`TemplateError`] - Target template failures

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod client;
mod context;
mod error;
mod hook;

// Re-exports
pub use client::{ImageClass, LabClient, LabClientFactory, LabImage, LabSize, SpawnEvent};
pub use context::{ImmutableField, Parameters};
pub use error::{
    BoxError, ClientError, ConfigError, FailureKind, HookError, ResolveError, TemplateError,
};
pub use hook::{DynHook, Hook, HookOutcome, IntoHookOutcome};
