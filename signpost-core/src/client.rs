//! Lab environment capability.
//!
//! The engine never talks to the lab environment itself. It builds a
//! [`LabClient`] per request through a [`LabClientFactory`] and hands it to
//! hooks inside [`Parameters`](crate::Parameters).

use crate::error::ClientError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Image class requested when spawning a lab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageClass {
    /// The image currently marked as recommended.
    Recommended,
    /// The most recent weekly build.
    LatestWeekly,
    /// The most recent release.
    LatestRelease,
}

/// Lab container size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabSize {
    /// Small.
    Small,
    /// Medium.
    Medium,
    /// Large.
    Large,
}

/// What to spawn when a user has no running lab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabImage {
    /// Which image to use.
    pub class: ImageClass,
    /// Which size to use.
    pub size: LabSize,
}

impl Default for LabImage {
    fn default() -> Self {
        Self {
            class: ImageClass::Recommended,
            size: LabSize::Medium,
        }
    }
}

/// One message from the spawn progress feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnEvent {
    /// Human-readable progress message.
    pub message: String,
    /// Whether the lab is ready.
    pub ready: bool,
}

/// Authenticated handle to one user's lab environment.
///
/// Implementations hold the delegated token. All methods act as that user.
#[async_trait]
pub trait LabClient: Send + Sync + 'static {
    /// Log in to the hub.
    async fn auth_to_hub(&self) -> Result<(), ClientError>;

    /// Log in to the user's running lab.
    async fn auth_to_lab(&self) -> Result<(), ClientError>;

    /// Whether the user currently has no running lab.
    async fn is_lab_stopped(&self) -> Result<bool, ClientError>;

    /// Request a new lab.
    async fn spawn_lab(&self, image: &LabImage) -> Result<(), ClientError>;

    /// Progress of the most recent spawn request.
    fn spawn_progress(&self) -> BoxStream<'_, Result<SpawnEvent, ClientError>>;

    /// Execute Python inside a lab kernel and return its standard output.
    async fn run_python(&self, code: &str) -> Result<String, ClientError>;

    /// `HEAD` a URL with the user's credentials; returns the status code.
    async fn head(&self, url: &str) -> Result<u16, ClientError>;

    /// `POST` a JSON body with the user's credentials and any extra
    /// `headers`; returns the status code.
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(&'static str, String)],
    ) -> Result<u16, ClientError>;

    /// XSRF token captured while authenticating to the lab, if any.
    fn xsrf_token(&self) -> Option<String>;
}

/// Builds a [`LabClient`] from a user and delegated token.
#[async_trait]
pub trait LabClientFactory: Send + Sync + 'static {
    /// Authenticate `token` for `user` against the lab environment.
    async fn connect(&self, user: &str, token: &str) -> Result<Arc<dyn LabClient>, ClientError>;
}
