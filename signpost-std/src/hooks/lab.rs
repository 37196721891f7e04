//! Make sure the user has a running lab before redirecting into it.
//!
//! [`AutostartLab`] starts a lab itself and waits for it. [`EnsureRunningLab`]
//! instead sends a user without a lab to the spawner, which comes back to
//! the gateway once the lab is up.

use futures::StreamExt;
use signpost_core::{
    ClientError, Hook, HookError, HookOutcome, IntoHookOutcome, LabClient, LabImage, Parameters,
};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// How long to wait for a spawned lab to report ready.
pub const LAB_SPAWN_TIMEOUT: Duration = Duration::from_secs(90);

/// Lab spawner URL that re-enters the gateway with the full request path.
pub const SPAWNER_TARGET: &str = "${base_url}/nb/user/${user}/rubin/ghostwriter/${path}";

/// Redirects users without a running lab to the spawner.
///
/// With a running lab the context is left alone. Otherwise the target
/// becomes [`SPAWNER_TARGET`] and the chain ends there.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsureRunningLab;

impl EnsureRunningLab {
    async fn check(&self, params: &Parameters) -> Result<HookOutcome, HookError> {
        let client = params.client.as_ref();
        debug!(user = %params.user, "logging in to hub");
        client.auth_to_hub().await?;

        if !client.is_lab_stopped().await? {
            debug!(user = %params.user, "lab already running");
            return Ok(HookOutcome::Unchanged);
        }
        info!(user = %params.user, "sending user to spawner");
        Ok(HookOutcome::Finished(params.clone().with_target(SPAWNER_TARGET)))
    }
}

impl Hook for EnsureRunningLab {
    async fn apply(&self, params: &Parameters) -> HookOutcome {
        self.check(params).await.into_outcome()
    }
}

/// Starts a lab for users who have none.
///
/// The lab is spawned from [`LabImage::default`] (the recommended image at
/// medium size) unless configured otherwise. The hook never changes the
/// context.
#[derive(Debug, Clone)]
pub struct AutostartLab {
    image: LabImage,
    spawn_timeout: Duration,
}

impl Default for AutostartLab {
    fn default() -> Self {
        Self::new()
    }
}

impl AutostartLab {
    /// Spawn the default image, waiting up to [`LAB_SPAWN_TIMEOUT`].
    pub fn new() -> Self {
        Self {
            image: LabImage::default(),
            spawn_timeout: LAB_SPAWN_TIMEOUT,
        }
    }

    /// Spawn `image` instead of the default.
    pub fn with_image(mut self, image: LabImage) -> Self {
        self.image = image;
        self
    }

    /// Wait at most `spawn_timeout` for the lab to become ready.
    pub fn with_spawn_timeout(mut self, spawn_timeout: Duration) -> Self {
        self.spawn_timeout = spawn_timeout;
        self
    }

    async fn ensure(&self, params: &Parameters) -> Result<(), HookError> {
        let client = params.client.as_ref();
        debug!(user = %params.user, "logging in to hub");
        client.auth_to_hub().await?;

        if client.is_lab_stopped().await? {
            info!(user = %params.user, image = ?self.image, "starting new lab");
            client.spawn_lab(&self.image).await?;
            self.follow_progress(client).await?;
        } else {
            debug!(user = %params.user, "lab already running");
        }
        Ok(())
    }

    async fn follow_progress(&self, client: &dyn LabClient) -> Result<(), HookError> {
        let mut progress = client.spawn_progress();
        let wait = async {
            while let Some(event) = progress.next().await {
                let event = event?;
                debug!(message = %event.message, "lab spawn progress");
                if event.ready {
                    return Ok(true);
                }
            }
            Ok::<_, ClientError>(false)
        };

        match timeout(self.spawn_timeout, wait).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => {
                warn!("spawn progress ended without a ready event");
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                warn!(timeout = ?self.spawn_timeout, "lab did not spawn in time");
                Err(ClientError::Timeout(self.spawn_timeout).into())
            }
        }
    }
}

impl Hook for AutostartLab {
    async fn apply(&self, params: &Parameters) -> HookOutcome {
        self.ensure(params).await.into_outcome()
    }
}
