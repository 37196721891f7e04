//! The assembled gateway.
//!
//! A [`Gateway`] owns validated settings, the hook registry and a
//! [`Resolver`]. It is the one object the HTTP layer needs.

use crate::{
    config::{MappingFile, Settings, normalize_base_url},
    resolver::{Redirect, ResolveRequest, Resolver},
};
use signpost_core::{ConfigError, LabClientFactory, ResolveError};
use signpost_std::{hooks::standard_registry, registry::HookRegistry, routing::RouteTable};
use std::{path::Path, sync::Arc};
use tracing::{error, info};

/// Routes, hooks and settings for one environment.
pub struct Gateway {
    settings: Settings,
    base_url: String,
    registry: Arc<HookRegistry>,
    resolver: Resolver,
}

impl Gateway {
    /// Validate `settings`, load the mapping file it names, and build a
    /// gateway using the standard hooks.
    pub fn from_settings(
        settings: Settings,
        clients: Arc<dyn LabClientFactory>,
    ) -> Result<Self, ConfigError> {
        let settings = settings.validate()?;
        let mapping = MappingFile::from_file(settings.mapping()?)?;
        Self::from_parts(settings, standard_registry(), &mapping, clients)
    }

    /// Build a gateway from already loaded parts.
    ///
    /// Only `environment_url` is required from `settings`. Timeouts must
    /// still be positive.
    pub fn from_parts(
        settings: Settings,
        registry: HookRegistry,
        mapping: &MappingFile,
        clients: Arc<dyn LabClientFactory>,
    ) -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(settings.base_url()?)?;
        settings.check_timeouts()?;
        let registry = Arc::new(registry);
        let table = build_table(&registry, &settings, mapping)?;
        let resolver = Resolver::new(table, clients).with_client_timeout(settings.client_timeout());

        info!(
            base_url = %base_url,
            path_prefix = %settings.path_prefix,
            routes = resolver.table().len(),
            hooks = registry.len(),
            "gateway ready"
        );
        Ok(Self {
            settings,
            base_url,
            registry,
            resolver,
        })
    }

    /// Replace the route table with one built from `mapping`.
    ///
    /// On error the current table stays in place.
    pub fn reload(&self, mapping: &MappingFile) -> Result<(), ConfigError> {
        let table = build_table(&self.registry, &self.settings, mapping).inspect_err(|e| {
            error!(error = %e, "route reload rejected; keeping current routes");
        })?;
        let routes = table.len();
        self.resolver.swap(table);
        info!(routes, "routes reloaded");
        Ok(())
    }

    /// Reload routes from a mapping file.
    pub fn reload_from_path(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let mapping = MappingFile::from_file(path).inspect_err(|e| {
            error!(error = %e, "route reload rejected; keeping current routes");
        })?;
        self.reload(&mapping)
    }

    /// Resolve `path` for `user` against this environment.
    pub async fn resolve_for(
        &self,
        path: &str,
        user: &str,
        token: &str,
    ) -> Result<Redirect, ResolveError> {
        let request = ResolveRequest::new(path, user, token, self.base_url.as_str());
        self.resolver.resolve(&request).await
    }

    /// Canonical prefixes of the current routes, in declaration order.
    pub fn routes(&self) -> Vec<String> {
        self.resolver.table().prefixes().map(str::to_string).collect()
    }

    /// Normalized environment URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Settings the gateway was built from.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Hooks routes may name.
    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// The underlying resolver.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }
}

fn build_table(
    registry: &HookRegistry,
    settings: &Settings,
    mapping: &MappingFile,
) -> Result<RouteTable, ConfigError> {
    RouteTable::builder(registry)
        .hook_timeout(settings.hook_timeout())
        .build(&mapping.routes)
}
