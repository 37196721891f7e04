//! # signpost-std
//!
//! Standard implementations for the signpost redirect engine.
//!
//! This crate provides:
//! - **Routing**: [`RouteTable`](routing::RouteTable) with longest-prefix lookup
//! - **Templates**: [`Template`](template::Template) parsing and substitution
//! - **Hook registry**: [`HookRegistry`](registry::HookRegistry)
//! - **Pipeline**: [`HookPipeline`](pipeline::HookPipeline) with the mutation check
//! - **Standard hooks**: lab autostart, notebook checkout, portal queries, timeout
//! - **Testing**: mock lab clients and observable hooks

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use signpost_core;

// Modules
pub mod hooks;
pub mod pipeline;
pub mod registry;
pub mod routing;
pub mod template;
pub mod testing;
