#![allow(dead_code)]

use signpost::{
    Gateway, HookRegistry, MappingFile, RouteDefinition, Settings,
    testing::{MockClientFactory, MockLabClient},
};
use std::sync::Arc;

// ============================================================================
// Fixtures
// ============================================================================

pub const BASE_URL: &str = "https://rsp.example.org";

pub const TUTORIAL_TARGET: &str =
    "${base_url}/nb/user/${user}/lab/tree/notebooks/tutorial-notebooks/${path}.ipynb";

pub fn settings() -> Settings {
    Settings {
        environment_url: Some(format!("{BASE_URL}/")),
        ..Settings::default()
    }
}

pub fn tutorial_route() -> RouteDefinition {
    RouteDefinition::new("/tutorials/", TUTORIAL_TARGET).with_hooks(["ensure_running_lab"])
}

pub fn mapping(routes: Vec<RouteDefinition>) -> MappingFile {
    MappingFile { routes }
}

// ============================================================================
// Gateways
// ============================================================================

/// A gateway whose lab client is `client`.
pub fn gateway(
    registry: HookRegistry,
    routes: Vec<RouteDefinition>,
    client: Arc<MockLabClient>,
) -> Gateway {
    Gateway::from_parts(
        settings(),
        registry,
        &mapping(routes),
        Arc::new(MockClientFactory::new(client)),
    )
    .expect("gateway should build")
}

pub fn standard_gateway(routes: Vec<RouteDefinition>, client: Arc<MockLabClient>) -> Gateway {
    gateway(signpost::hooks::standard_registry(), routes, client)
}
