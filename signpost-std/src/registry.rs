//! Name-keyed hook registry.
//!
//! Routes refer to hooks by name. The registry maps those names to shared
//! implementations and is consulted once, when a route table is built.
//! Names may carry a namespace prefix (`signpost.hooks.vacuous_hook`) which
//! is stripped before lookup.

use signpost_core::{DynHook, Hook};
use std::{collections::HashMap, sync::Arc};

/// An immutable set of named hooks.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<String, Arc<dyn DynHook>>,
    namespace: Option<String>,
}

impl HookRegistry {
    /// Start building a registry.
    pub fn builder() -> HookRegistryBuilder {
        HookRegistryBuilder::new()
    }

    /// Strip the configured namespace from `name`, if present.
    pub fn canonical_name<'a>(&self, name: &'a str) -> &'a str {
        let name = name.trim();
        self.namespace
            .as_deref()
            .and_then(|ns| name.strip_prefix(ns))
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(name)
    }

    /// Look up a hook by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn DynHook>> {
        self.hooks.get(self.canonical_name(name)).cloned()
    }

    /// Whether `name` resolves to a hook.
    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(self.canonical_name(name))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.hooks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

/// Builder for constructing a [`HookRegistry`].
#[derive(Default)]
pub struct HookRegistryBuilder {
    hooks: HashMap<String, Arc<dyn DynHook>>,
    namespace: Option<String>,
}

impl HookRegistryBuilder {
    /// Create a new empty registry builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept names qualified with `namespace` (without the trailing `.`).
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Register a hook under `name`, replacing any earlier registration.
    pub fn register<H: Hook>(self, name: impl Into<String>, hook: H) -> Self {
        self.register_dyn(name, Arc::new(hook))
    }

    /// Register an already shared hook under `name`.
    pub fn register_dyn(mut self, name: impl Into<String>, hook: Arc<dyn DynHook>) -> Self {
        self.hooks.insert(name.into(), hook);
        self
    }

    /// Build the registry.
    pub fn build(self) -> HookRegistry {
        HookRegistry {
            hooks: self.hooks,
            namespace: self.namespace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CallLog, RecordingHook};

    fn registry() -> HookRegistry {
        HookRegistry::builder()
            .namespace("signpost.hooks")
            .register("record", RecordingHook::new("record", CallLog::new()))
            .build()
    }

    #[test]
    fn test_lookup_by_plain_and_qualified_name() {
        let r = registry();
        assert!(r.contains("record"));
        assert!(r.contains("signpost.hooks.record"));
        assert!(r.get("signpost.hooks.record").is_some());
    }

    #[test]
    fn test_other_namespaces_are_not_stripped() {
        let r = registry();
        assert!(!r.contains("elsewhere.record"));
        assert!(!r.contains("signpost.hooksrecord"));
    }

    #[test]
    fn test_canonical_name_without_namespace() {
        let r = HookRegistry::builder().build();
        assert_eq!(r.canonical_name("a.b.c"), "a.b.c");
        assert!(r.is_empty());
    }

    #[test]
    fn test_names_sorted() {
        let log = CallLog::new();
        let r = HookRegistry::builder()
            .register("zeta", RecordingHook::new("z", log.clone()))
            .register("alpha", RecordingHook::new("a", log))
            .build();
        assert_eq!(r.names(), vec!["alpha", "zeta"]);
        assert_eq!(r.len(), 2);
    }
}
