//! # Resolution Orchestrator
//!
//! Turns a request into a redirect:
//!
//! 1. Match the path against the current route table snapshot.
//! 2. Build a lab client for the user.
//! 3. Run the route's hooks.
//! 4. Substitute the final target and check that it is an absolute URL.
//!    If a hook ended the chain early, `${path}` is the full request path.
//!
//! Each step has its own failure, see [`ResolveError`]. The table snapshot
//! is taken once per request; a reload during a request does not affect it.

use arc_swap::ArcSwap;
use signpost_core::{
    ClientError, LabClient, LabClientFactory, Parameters, ResolveError,
};
use signpost_std::{pipeline::Completion, routing::RouteTable, template};
use std::{fmt, sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

/// Everything needed to resolve one request.
#[derive(Clone)]
pub struct ResolveRequest {
    /// Request path, e.g. `/tutorials/intro`.
    pub path: String,
    /// Authenticated username.
    pub user: String,
    /// Delegated token for `user`.
    pub token: String,
    /// Environment root URL.
    pub base_url: String,
}

impl ResolveRequest {
    /// Create a request.
    pub fn new(
        path: impl Into<String>,
        user: impl Into<String>,
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            user: user.into(),
            token: token.into(),
            base_url: base_url.into(),
        }
    }
}

impl fmt::Debug for ResolveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveRequest")
            .field("path", &self.path)
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// A successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Absolute URL to send the user to.
    pub location: String,
    /// Canonical prefix of the route that matched.
    pub route: String,
    /// Discriminator set by the route's hooks, if any.
    pub unique_id: Option<String>,
}

/// Resolves requests against a swappable route table.
pub struct Resolver {
    table: ArcSwap<RouteTable>,
    clients: Arc<dyn LabClientFactory>,
    client_timeout: Option<Duration>,
}

impl Resolver {
    /// Create a resolver serving `table` with clients from `clients`.
    pub fn new(table: RouteTable, clients: Arc<dyn LabClientFactory>) -> Self {
        Self {
            table: ArcSwap::from_pointee(table),
            clients,
            client_timeout: None,
        }
    }

    /// Give up on building a client after `limit`.
    pub fn with_client_timeout(mut self, limit: Duration) -> Self {
        self.client_timeout = Some(limit);
        self
    }

    /// The current route table.
    pub fn table(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    /// Replace the route table, returning the previous one.
    ///
    /// Requests already in flight keep the table they started with.
    pub fn swap(&self, table: RouteTable) -> Arc<RouteTable> {
        self.table.swap(Arc::new(table))
    }

    /// Resolve one request.
    pub async fn resolve(&self, request: &ResolveRequest) -> Result<Redirect, ResolveError> {
        let span = info_span!("resolve", path = %request.path, user = %request.user);
        self.resolve_inner(request).instrument(span).await
    }

    async fn resolve_inner(&self, request: &ResolveRequest) -> Result<Redirect, ResolveError> {
        let table = self.table.load_full();
        let Some(matched) = table.match_path(&request.path) else {
            info!("no route matches");
            return Err(ResolveError::NotFound {
                path: request.path.clone(),
            });
        };
        let route = matched.route;
        debug!(route = route.prefix(), residual = matched.residual, "route matched");

        let client = self.connect(&request.user, &request.token).await?;
        let params = Parameters::new(
            request.base_url.clone(),
            request.user.clone(),
            matched.residual,
            route.target(),
            client,
            request.token.clone(),
        );

        let (location, params) = match route.pipeline().execute(params).await? {
            Completion::Exhausted(params) => {
                let location = if params.target == route.target() {
                    route.template().render(&params)
                } else {
                    template::resolve(&params.target, &params)?
                };
                (location, params)
            }
            Completion::Finished { hook, mut params } => {
                debug!(hook = %hook, "hook ended the chain; using the full request path");
                params.path = request.path.trim_start_matches('/').to_string();
                (template::resolve(&params.target, &params)?, params)
            }
        };
        check_absolute(&location)?;

        info!(route = route.prefix(), location = %location, "redirecting");
        Ok(Redirect {
            location,
            route: route.prefix().to_string(),
            unique_id: params.unique_id,
        })
    }

    async fn connect(&self, user: &str, token: &str) -> Result<Arc<dyn LabClient>, ResolveError> {
        let connecting = self.clients.connect(user, token);
        let result = match self.client_timeout {
            Some(limit) => timeout(limit, connecting)
                .await
                .unwrap_or_else(|_| Err(ClientError::Timeout(limit))),
            None => connecting.await,
        };
        result.map_err(|e| {
            warn!(error = %e, "lab client unavailable");
            ResolveError::UpstreamUnavailable(e)
        })
    }
}

fn check_absolute(location: &str) -> Result<(), ResolveError> {
    let invalid = |reason: String| ResolveError::InvalidTarget {
        target: location.to_string(),
        reason,
    };
    let url = Url::parse(location).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() || url.host().is_none() {
        return Err(invalid("not an absolute URL with a host".to_string()));
    }
    Ok(())
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("routes", &self.table().len())
            .field("client_timeout", &self.client_timeout)
            .finish_non_exhaustive()
    }
}
