//! Portal query notebooks.

use signpost_core::{ClientError, Hook, HookError, HookOutcome, IntoHookOutcome, Parameters};
use tracing::debug;
use url::Url;

/// Ensures the user's lab has a notebook for a portal TAP query.
///
/// The query id is the last component of the request path. If
/// `notebooks/queries/portal_<id>.ipynb` does not exist yet, the lab's
/// query extension is asked to create it. Needs a running lab.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortalQuery;

/// URLs derived from one portal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalUrls {
    /// TAP job URL handed to the lab.
    pub query: String,
    /// Where the query notebook lives in the lab.
    pub notebook: String,
    /// Lab endpoint that creates query notebooks.
    pub create: String,
}

impl PortalUrls {
    /// Derive the URLs for `query_id` in `user`'s lab.
    ///
    /// Every URL is resolved from the root of `base_url`'s host, so a path
    /// on `base_url` itself is not kept.
    pub fn new(base_url: &str, user: &str, query_id: &str) -> Result<Self, HookError> {
        let base = Url::parse(base_url).map_err(|e| HookError::Custom(Box::new(e)))?;
        let join = |path: String| {
            base.join(&path)
                .map(String::from)
                .map_err(|e| HookError::Custom(Box::new(e)))
        };
        Ok(Self {
            query: join(format!("/api/tap/async/{query_id}"))?,
            notebook: join(format!(
                "/nb/user/{user}/files/notebooks/queries/portal_{query_id}.ipynb"
            ))?,
            create: join(format!("/nb/user/{user}/rubin/query"))?,
        })
    }
}

/// The last path component, which names the query.
pub fn query_id(path: &str) -> Result<&str, HookError> {
    match path.trim_end_matches('/').rsplit('/').next() {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(HookError::InvalidPath {
            path: path.to_string(),
            reason: "no query id".to_string(),
        }),
    }
}

impl PortalQuery {
    async fn run(&self, params: &Parameters) -> Result<(), HookError> {
        let client = params.client.as_ref();
        let id = query_id(&params.path)?;
        let urls = PortalUrls::new(&params.base_url, &params.user, id)?;
        debug!(user = %params.user, query_url = %urls.query, "preparing portal query");

        client.auth_to_hub().await?;
        client.auth_to_lab().await?;

        if client.head(&urls.notebook).await? == 200 {
            debug!(query_id = id, "notebook for query exists");
            return Ok(());
        }

        debug!(query_id = id, "creating query notebook");
        let body = serde_json::json!({ "type": "portal", "value": urls.query });
        let headers: Vec<_> = client
            .xsrf_token()
            .map(|token| ("X-XSRFToken", token))
            .into_iter()
            .collect();
        let status = client.post_json(&urls.create, &body, &headers).await?;
        if status >= 400 {
            return Err(ClientError::Status {
                status,
                url: urls.create,
            }
            .into());
        }
        Ok(())
    }
}

impl Hook for PortalQuery {
    async fn apply(&self, params: &Parameters) -> HookOutcome {
        self.run(params).await.into_outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockLabClient, params_for};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const NOTEBOOK: &str =
        "https://data.example.org/nb/user/rachel/files/notebooks/queries/portal_abc123.ipynb";
    const CREATE: &str = "https://data.example.org/nb/user/rachel/rubin/query";

    #[test]
    fn test_query_id_is_last_component() {
        assert_eq!(query_id("queries/abc123").unwrap(), "abc123");
        assert_eq!(query_id("abc123/").unwrap(), "abc123");
        assert!(query_id("").is_err());
    }

    #[test]
    fn test_urls() {
        let urls = PortalUrls::new("https://data.example.org/", "rachel", "abc123").unwrap();
        assert_eq!(urls.query, "https://data.example.org/api/tap/async/abc123");
        assert_eq!(urls.notebook, NOTEBOOK);
        assert_eq!(urls.create, CREATE);
    }

    #[test]
    fn test_urls_resolve_from_host_root() {
        let urls = PortalUrls::new("https://data.example.org/rsp", "rachel", "abc123").unwrap();
        assert_eq!(urls.query, "https://data.example.org/api/tap/async/abc123");
        assert_eq!(urls.notebook, NOTEBOOK);
        assert_eq!(urls.create, CREATE);
    }

    #[test]
    fn test_unparsable_base_url() {
        assert!(PortalUrls::new("not a url", "rachel", "abc123").is_err());
    }

    #[tokio::test]
    async fn test_existing_notebook_is_not_recreated() {
        let client = Arc::new(MockLabClient::new().head_status(200));
        let p = params_for("abc123", "", client.clone());

        assert!(matches!(PortalQuery.apply(&p).await, HookOutcome::Unchanged));
        assert_eq!(
            client.calls(),
            vec!["auth_to_hub".to_string(), "auth_to_lab".to_string(), format!("head {NOTEBOOK}")]
        );
        assert!(client.posts().is_empty());
    }

    #[tokio::test]
    async fn test_missing_notebook_is_created_with_xsrf() {
        let client = Arc::new(MockLabClient::new().head_status(404).xsrf("xsrf-value"));
        let p = params_for("abc123", "", client.clone());

        assert!(matches!(PortalQuery.apply(&p).await, HookOutcome::Unchanged));
        let posts = client.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].url, CREATE);
        assert_eq!(
            posts[0].body,
            serde_json::json!({
                "type": "portal",
                "value": "https://data.example.org/api/tap/async/abc123",
            })
        );
        assert_eq!(posts[0].headers, vec![("X-XSRFToken", "xsrf-value".to_string())]);
    }

    #[tokio::test]
    async fn test_rejected_creation_fails() {
        let client = Arc::new(MockLabClient::new().head_status(404).post_status(403));
        let p = params_for("abc123", "", client);

        match PortalQuery.apply(&p).await {
            HookOutcome::Failed(reason) => assert_eq!(
                reason.to_string(),
                format!("unexpected HTTP status 403 from {CREATE}")
            ),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
