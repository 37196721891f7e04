//! The route table.
//!
//! A [`RouteTable`] is built once from [`RouteDefinition`]s and never
//! mutated. Building validates everything a request would otherwise trip
//! over: prefixes are canonicalized and must be unique, target templates
//! must parse, and every hook name must resolve in the [`HookRegistry`].

use super::trie::PrefixTrie;
use crate::{hooks::TimeoutHook, pipeline::HookPipeline, registry::HookRegistry, template::Template};
use serde::{Deserialize, Serialize};
use signpost_core::ConfigError;
use std::time::Duration;
use tracing::{debug, info};

/// One route as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDefinition {
    /// Path prefix to match, e.g. `/tutorials/`. Canonicalized on load.
    pub source_prefix: String,
    /// Target URL template.
    pub target: String,
    /// Hook names to run, in order.
    #[serde(default)]
    pub hooks: Vec<String>,
}

impl RouteDefinition {
    /// A route without hooks.
    pub fn new(source_prefix: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_prefix: source_prefix.into(),
            target: target.into(),
            hooks: Vec::new(),
        }
    }

    /// Replace the hook list.
    pub fn with_hooks<I, S>(mut self, hooks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hooks = hooks.into_iter().map(Into::into).collect();
        self
    }
}

/// Canonicalize a source prefix to `/segment/.../`.
///
/// Surrounding slashes are stripped and exactly one leading and one trailing
/// `/` added. `/` stays `/`.
pub fn canonical_prefix(prefix: &str) -> Result<String, ConfigError> {
    let invalid = |reason| ConfigError::InvalidPrefix {
        prefix: prefix.to_string(),
        reason,
    };

    let trimmed = prefix.trim();
    if trimmed.is_empty() {
        return Err(invalid("prefix is empty"));
    }
    let inner = trimmed.trim_matches('/');
    if inner.is_empty() {
        return Ok("/".to_string());
    }
    if inner.chars().any(char::is_whitespace) {
        return Err(invalid("prefix contains whitespace"));
    }
    if inner.contains("//") {
        return Err(invalid("prefix contains an empty segment"));
    }
    Ok(format!("/{inner}/"))
}

/// A validated route.
#[derive(Debug)]
pub struct Route {
    prefix: String,
    template: Template,
    pipeline: HookPipeline,
}

impl Route {
    /// Canonical source prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Raw target template, as configured.
    pub fn target(&self) -> &str {
        self.template.as_str()
    }

    /// Parsed target template.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Hooks to run before redirecting.
    pub fn pipeline(&self) -> &HookPipeline {
        &self.pipeline
    }
}

/// Result of a successful lookup.
#[derive(Debug, Clone, Copy)]
pub struct RouteMatch<'a> {
    /// The route with the longest matching prefix.
    pub route: &'a Route,
    /// The request path with the prefix removed.
    pub residual: &'a str,
}

/// An immutable set of routes with longest-prefix lookup.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    trie: PrefixTrie<usize>,
}

impl RouteTable {
    /// A table with no routes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start building a table whose hooks come from `registry`.
    pub fn builder(registry: &HookRegistry) -> RouteTableBuilder<'_> {
        RouteTableBuilder::new(registry)
    }

    /// Find the route whose prefix is the longest prefix of `path`.
    ///
    /// A `path` without a leading `/` is matched as if it had one. `None`
    /// means no route applies.
    pub fn match_path<'a>(&'a self, path: &'a str) -> Option<RouteMatch<'a>> {
        let (index, residual) = if path.starts_with('/') {
            let (len, index) = self.trie.longest_prefix_match(path)?;
            (*index, &path[len..])
        } else {
            let rooted = format!("/{path}");
            let (len, index) = self.trie.longest_prefix_match(&rooted)?;
            (*index, &path[len - 1..])
        };
        let route = self.routes.get(index)?;
        Some(RouteMatch { route, residual })
    }

    /// Canonical prefixes in declaration order.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(Route::prefix)
    }

    /// All routes in declaration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a [`RouteTable`].
pub struct RouteTableBuilder<'r> {
    registry: &'r HookRegistry,
    hook_timeout: Option<Duration>,
}

impl<'r> RouteTableBuilder<'r> {
    /// Create a builder resolving hooks from `registry`.
    pub fn new(registry: &'r HookRegistry) -> Self {
        Self {
            registry,
            hook_timeout: None,
        }
    }

    /// Bound every hook invocation by `timeout`.
    pub fn hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout = Some(timeout);
        self
    }

    /// Validate `definitions` and build the table.
    pub fn build<'d, I>(self, definitions: I) -> Result<RouteTable, ConfigError>
    where
        I: IntoIterator<Item = &'d RouteDefinition>,
    {
        let mut table = RouteTable::empty();

        for def in definitions {
            let route = self.route(def)?;
            if table.trie.contains(&route.prefix) {
                return Err(ConfigError::AmbiguousPrefix {
                    prefix: route.prefix,
                });
            }
            info!(
                prefix = %route.prefix,
                target = %route.target(),
                hooks = ?route.pipeline.names().collect::<Vec<_>>(),
                "route loaded"
            );
            table.trie.insert(&route.prefix, table.routes.len());
            table.routes.push(route);
        }

        debug!(routes = table.len(), "route table built");
        Ok(table)
    }

    fn route(&self, def: &RouteDefinition) -> Result<Route, ConfigError> {
        let prefix = canonical_prefix(&def.source_prefix)?;
        let template = Template::parse(&def.target).map_err(|source| ConfigError::Template {
            route: prefix.clone(),
            source,
        })?;

        let mut pipeline = HookPipeline::new();
        for name in &def.hooks {
            let hook = self
                .registry
                .get(name)
                .ok_or_else(|| ConfigError::UnknownHook {
                    route: prefix.clone(),
                    hook: name.clone(),
                })?;
            let name = self.registry.canonical_name(name);
            pipeline = match self.hook_timeout {
                Some(timeout) => pipeline.with(name, TimeoutHook::new(hook, timeout)),
                None => pipeline.with_dyn(name, hook),
            };
        }

        Ok(Route {
            prefix,
            template,
            pipeline,
        })
    }
}
