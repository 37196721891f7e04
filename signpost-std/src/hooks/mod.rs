//! # Standard Hooks
//!
//! | Name | Hook | Effect |
//! |------|------|--------|
//! | `vacuous_hook` | [`VacuousHook`] | Logs; never changes the context |
//! | `ensure_running_lab` | [`EnsureRunningLab`] | Sends users without a lab to the spawner; ends the chain |
//! | `ensure_autostart_lab` | [`AutostartLab`] | Spawns a lab if none is running and waits for it |
//! | `github_notebook` | [`GithubNotebook`] | Copies a GitHub notebook; rewrites `target` |
//! | `system_test` | [`SystemTest`] | Copies a system test notebook; may rewrite `target` |
//! | `portal_query` | [`PortalQuery`] | Creates a portal query notebook |
//!
//! [`TimeoutHook`] bounds any hook's running time and is applied by the
//! route table builder.

mod lab;
mod notebook;
mod portal;
mod timeout;
mod vacuous;

pub use lab::{AutostartLab, EnsureRunningLab, LAB_SPAWN_TIMEOUT, SPAWNER_TARGET};
pub use notebook::{ALLOWED_OWNERS, GithubNotebook, GithubSource, SystemTest};
pub use portal::{PortalQuery, PortalUrls, query_id};
pub use timeout::TimeoutHook;
pub use vacuous::VacuousHook;

use crate::registry::HookRegistry;

/// Namespace accepted in front of standard hook names.
pub const NAMESPACE: &str = "signpost.hooks";

/// A registry holding every standard hook under its configuration name.
pub fn standard_registry() -> HookRegistry {
    HookRegistry::builder()
        .namespace(NAMESPACE)
        .register("vacuous_hook", VacuousHook)
        .register("ensure_running_lab", EnsureRunningLab)
        .register("ensure_autostart_lab", AutostartLab::new())
        .register("github_notebook", GithubNotebook::new())
        .register("system_test", SystemTest)
        .register("portal_query", PortalQuery)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_names() {
        let registry = standard_registry();
        assert_eq!(
            registry.names(),
            vec![
                "ensure_autostart_lab",
                "ensure_running_lab",
                "github_notebook",
                "portal_query",
                "system_test",
                "vacuous_hook",
            ]
        );
        assert!(registry.contains("signpost.hooks.portal_query"));
        assert!(registry.contains("signpost.hooks.ensure_autostart_lab"));
    }
}
