//! # signpost - Personalized Redirect Gateway
//!
//! `signpost` turns a request path into a per-user redirect. Each route maps
//! a path prefix to a target URL template and an ordered list of hooks that
//! prepare the user's lab environment (start a lab, check out a notebook,
//! create a query) before the redirect is issued.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use signpost::prelude::*;
//!
//! let settings = Settings::load(Some(Path::new("/etc/signpost/settings.yaml")))?;
//! signpost::logging::init(&settings.logging)?;
//!
//! let gateway = Gateway::from_settings(settings, Arc::new(MyClientFactory::new()))?;
//! let redirect = gateway.resolve_for("/tutorials/intro", "alice", &token).await?;
//! ```
//!
//! ## Crates
//!
//! - `signpost-core`: context, hook and lab client traits, errors
//! - `signpost-std`: routing, templates, pipeline, standard hooks
//! - `signpost`: configuration, logging, the resolver and the gateway

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod config;
pub mod gateway;
pub mod logging;
pub mod resolver;

pub use signpost_core::{
    // Errors
    BoxError,
    ClientError,
    ConfigError,
    // Hook
    DynHook,
    FailureKind,
    Hook,
    HookError,
    HookOutcome,
    // Lab client
    ImageClass,
    // Context
    ImmutableField,
    IntoHookOutcome,
    LabClient,
    LabClientFactory,
    LabImage,
    LabSize,
    Parameters,
    ResolveError,
    SpawnEvent,
    TemplateError,
};

pub use config::{LoggingSettings, MappingFile, Profile, Settings};
pub use gateway::Gateway;
pub use resolver::{Redirect, ResolveRequest, Resolver};

pub use signpost_std::{
    pipeline::{Completion, HookPipeline},
    registry::{HookRegistry, HookRegistryBuilder},
    routing::{Route, RouteDefinition, RouteMatch, RouteTable},
    template::Template,
};

/// Standard hook implementations.
pub mod hooks {
    #![allow(clippy::wildcard_imports)]
    pub use signpost_std::hooks::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use signpost_std::testing::*;
}

/// Prelude module - common imports for signpost.
///
/// # Usage
///
/// ```rust,ignore
/// use signpost::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ConfigError, Gateway, Hook, HookOutcome, HookRegistry, IntoHookOutcome, LabClient,
        LabClientFactory, MappingFile, Parameters, Redirect, ResolveError, ResolveRequest,
        RouteDefinition, Settings,
    };
}
