//! # Parameter Context
//!
//! [`Parameters`] is the per-request state threaded through a route's hook
//! chain and finally substituted into the target template.
//!
//! Only [`Parameters::target`] and [`Parameters::unique_id`] may differ
//! between the context a hook receives and the context it returns. The other
//! fields carry the identity of the request; the pipeline checks them with
//! [`Parameters::changed_immutable_fields`] after every hook.

use crate::client::LabClient;
use std::{fmt, sync::Arc};

/// Substitution parameters for one request.
///
/// Fields are public so hooks can build a replacement context directly.
/// Whether the replacement is acceptable is decided by the pipeline, not by
/// the type system.
#[derive(Clone)]
pub struct Parameters {
    /// Root URL of the environment, e.g. `https://data.example.org`.
    pub base_url: String,
    /// Authenticated username.
    pub user: String,
    /// Request path left over after the matched prefix was stripped.
    pub path: String,
    /// Target template; starts as the route's raw template.
    pub target: String,
    /// Discriminator set by hooks that generate artifacts.
    pub unique_id: Option<String>,
    /// Authenticated handle to the user's lab environment.
    pub client: Arc<dyn LabClient>,
    /// Delegated token backing `client`.
    pub token: String,
}

impl Parameters {
    /// Build the initial context for a matched request.
    ///
    /// `target` is the route's target template, unsubstituted. `unique_id`
    /// starts empty.
    pub fn new(
        base_url: impl Into<String>,
        user: impl Into<String>,
        path: impl Into<String>,
        target: impl Into<String>,
        client: Arc<dyn LabClient>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            user: user.into(),
            path: path.into(),
            target: target.into(),
            unique_id: None,
            client,
            token: token.into(),
        }
    }

    /// Return a copy with `target` replaced.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Return a copy with `unique_id` replaced.
    pub fn with_unique_id(mut self, unique_id: Option<String>) -> Self {
        self.unique_id = unique_id;
        self
    }

    /// Compare every immutable field against `other`.
    ///
    /// Returns the fields that differ, in declaration order. An empty vector
    /// means `other` is an acceptable replacement for `self`. `client` is
    /// compared by identity: a different handle to the same user is still a
    /// change.
    pub fn changed_immutable_fields(&self, other: &Parameters) -> Vec<ImmutableField> {
        let mut changed = Vec::new();
        if self.base_url != other.base_url {
            changed.push(ImmutableField::BaseUrl);
        }
        if self.user != other.user {
            changed.push(ImmutableField::User);
        }
        if self.path != other.path {
            changed.push(ImmutableField::Path);
        }
        if !same_client(&self.client, &other.client) {
            changed.push(ImmutableField::Client);
        }
        if self.token != other.token {
            changed.push(ImmutableField::Token);
        }
        changed
    }
}

// Compare data pointers only; vtable pointers for the same object may differ
// between codegen units.
fn same_client(a: &Arc<dyn LabClient>, b: &Arc<dyn LabClient>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

impl fmt::Debug for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameters")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .field("path", &self.path)
            .field("target", &self.target)
            .field("unique_id", &self.unique_id)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// A field of [`Parameters`] that hooks must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImmutableField {
    /// [`Parameters::base_url`]
    BaseUrl,
    /// [`Parameters::user`]
    User,
    /// [`Parameters::path`]
    Path,
    /// [`Parameters::client`]
    Client,
    /// [`Parameters::token`]
    Token,
}

impl ImmutableField {
    /// Field name as it appears on [`Parameters`].
    pub const fn as_str(self) -> &'static str {
        match self {
            ImmutableField::BaseUrl => "base_url",
            ImmutableField::User => "user",
            ImmutableField::Path => "path",
            ImmutableField::Client => "client",
            ImmutableField::Token => "token",
        }
    }
}

impl fmt::Display for ImmutableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::client::{LabImage, SpawnEvent};
    use crate::error::ClientError;
    use async_trait::async_trait;
    use futures::stream::{self, BoxStream};

    pub(crate) struct NullClient;

    #[async_trait]
    impl LabClient for NullClient {
        async fn auth_to_hub(&self) -> Result<(), ClientError> {
            Ok(())
        }
        async fn auth_to_lab(&self) -> Result<(), ClientError> {
            Ok(())
        }
        async fn is_lab_stopped(&self) -> Result<bool, ClientError> {
            Ok(false)
        }
        async fn spawn_lab(&self, _image: &LabImage) -> Result<(), ClientError> {
            Ok(())
        }
        fn spawn_progress(&self) -> BoxStream<'_, Result<SpawnEvent, ClientError>> {
            Box::pin(stream::empty())
        }
        async fn run_python(&self, _code: &str) -> Result<String, ClientError> {
            Ok(String::new())
        }
        async fn head(&self, _url: &str) -> Result<u16, ClientError> {
            Ok(200)
        }
        async fn post_json(
            &self,
            _url: &str,
            _body: &serde_json::Value,
            _headers: &[(&'static str, String)],
        ) -> Result<u16, ClientError> {
            Ok(200)
        }
        fn xsrf_token(&self) -> Option<String> {
            None
        }
    }

    fn params() -> Parameters {
        Parameters::new(
            "https://data.example.org",
            "rachel",
            "notebook05",
            "${base_url}/nb/user/${user}/lab/tree/${path}.ipynb",
            Arc::new(NullClient),
            "token-of-affection",
        )
    }

    #[test]
    fn test_new_leaves_unique_id_empty() {
        let p = params();
        assert_eq!(p.unique_id, None);
        assert_eq!(p.target, "${base_url}/nb/user/${user}/lab/tree/${path}.ipynb");
    }

    #[test]
    fn test_target_and_unique_id_are_mutable() {
        let original = params();
        let next = original
            .clone()
            .with_target("${base_url}/elsewhere")
            .with_unique_id(Some("2".to_string()));
        assert!(original.changed_immutable_fields(&next).is_empty());
    }

    #[test]
    fn test_every_immutable_field_is_checked() {
        let original = params();
        let mut next = original.clone();
        next.base_url = "https://evil.example.org".to_string();
        next.user = "mallory".to_string();
        next.path = "other".to_string();
        next.client = Arc::new(NullClient);
        next.token = "stolen".to_string();
        assert_eq!(
            original.changed_immutable_fields(&next),
            vec![
                ImmutableField::BaseUrl,
                ImmutableField::User,
                ImmutableField::Path,
                ImmutableField::Client,
                ImmutableField::Token,
            ]
        );
    }

    #[test]
    fn test_cloned_client_is_the_same_client() {
        let original = params();
        let next = original.clone();
        assert!(!original.changed_immutable_fields(&next).contains(&ImmutableField::Client));
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", params());
        assert!(!rendered.contains("token-of-affection"));
        assert!(rendered.contains("rachel"));
    }
}
