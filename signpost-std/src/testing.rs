//! Testing utilities for signpost.
//!
//! This module provides stand-ins for the lab environment and a few hooks
//! with observable behavior, so routes and pipelines can be exercised
//! without network access.
//!
//! # Features
//!
//! - [`MockLabClient`]: A programmable [`LabClient`] that records its calls
//! - [`MockClientFactory`]: A [`LabClientFactory`] handing out a shared mock
//! - [`CallLog`]: A shared, ordered record of calls across hooks
//! - [`RecordingHook`]: A hook that records each invocation
//! - [`FailingHook`]: A hook that always fails
//! - [`FnHook`]: A hook built from a closure

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use signpost_core::{
    ClientError, Hook, HookOutcome, LabClient, LabClientFactory, LabImage, Parameters, SpawnEvent,
};
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Call Log
// ============================================================================

/// An ordered, shareable list of call labels.
///
/// Clones share the same underlying list.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: impl Into<String>) {
        lock(&self.entries).push(entry.into());
    }

    /// Snapshot of all entries in call order.
    pub fn entries(&self) -> Vec<String> {
        lock(&self.entries).clone()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

// ============================================================================
// Mock Lab Client
// ============================================================================

/// A recorded `POST`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPost {
    /// Request URL.
    pub url: String,
    /// JSON body.
    pub body: serde_json::Value,
    /// Extra headers passed by the caller.
    pub headers: Vec<(&'static str, String)>,
}

/// A [`LabClient`] whose answers are fixed up front.
///
/// Every call is appended to [`MockLabClient::calls`] by method name
/// (`head` and `post_json` include the URL).
///
/// # Example
///
/// ```rust,ignore
/// let client = Arc::new(MockLabClient::new().stopped(true).python_output("0\n"));
/// ```
#[derive(Debug)]
pub struct MockLabClient {
    stopped: bool,
    spawn_events: Vec<SpawnEvent>,
    spawn_hangs: bool,
    python_output: String,
    head_status: u16,
    post_status: u16,
    xsrf: Option<String>,
    unreachable: bool,
    calls: CallLog,
    scripts: Mutex<Vec<String>>,
    posts: Mutex<Vec<RecordedPost>>,
}

impl Default for MockLabClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLabClient {
    /// A client for a user whose lab is already running.
    pub fn new() -> Self {
        Self {
            stopped: false,
            spawn_events: vec![SpawnEvent {
                message: "Lab is ready".to_string(),
                ready: true,
            }],
            spawn_hangs: false,
            python_output: "0\n".to_string(),
            head_status: 200,
            post_status: 200,
            xsrf: None,
            unreachable: false,
            calls: CallLog::new(),
            scripts: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
        }
    }

    /// Report the lab as stopped.
    pub fn stopped(mut self, stopped: bool) -> Self {
        self.stopped = stopped;
        self
    }

    /// Replace the spawn progress feed.
    pub fn spawn_events(mut self, events: Vec<SpawnEvent>) -> Self {
        self.spawn_events = events;
        self
    }

    /// Make the spawn progress feed never yield.
    pub fn spawn_hangs(mut self) -> Self {
        self.spawn_hangs = true;
        self
    }

    /// Standard output returned by every `run_python`.
    pub fn python_output(mut self, output: impl Into<String>) -> Self {
        self.python_output = output.into();
        self
    }

    /// Status returned by `head`.
    pub fn head_status(mut self, status: u16) -> Self {
        self.head_status = status;
        self
    }

    /// Status returned by `post_json`.
    pub fn post_status(mut self, status: u16) -> Self {
        self.post_status = status;
        self
    }

    /// XSRF token reported after lab authentication.
    pub fn xsrf(mut self, token: impl Into<String>) -> Self {
        self.xsrf = Some(token.into());
        self
    }

    /// Fail hub authentication as if the environment were down.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Share an existing call log, e.g. with [`RecordingHook`]s.
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.calls = log;
        self
    }

    /// Calls made so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.entries()
    }

    /// Code passed to `run_python`, in call order.
    pub fn scripts(&self) -> Vec<String> {
        lock(&self.scripts).clone()
    }

    /// Requests passed to `post_json`, in call order.
    pub fn posts(&self) -> Vec<RecordedPost> {
        lock(&self.posts).clone()
    }
}

#[async_trait]
impl LabClient for MockLabClient {
    async fn auth_to_hub(&self) -> Result<(), ClientError> {
        self.calls.record("auth_to_hub");
        if self.unreachable {
            return Err(ClientError::Unreachable("connection refused".into()));
        }
        Ok(())
    }

    async fn auth_to_lab(&self) -> Result<(), ClientError> {
        self.calls.record("auth_to_lab");
        Ok(())
    }

    async fn is_lab_stopped(&self) -> Result<bool, ClientError> {
        self.calls.record("is_lab_stopped");
        Ok(self.stopped)
    }

    async fn spawn_lab(&self, _image: &LabImage) -> Result<(), ClientError> {
        self.calls.record("spawn_lab");
        Ok(())
    }

    fn spawn_progress(&self) -> BoxStream<'_, Result<SpawnEvent, ClientError>> {
        self.calls.record("spawn_progress");
        if self.spawn_hangs {
            return stream::pending().boxed();
        }
        stream::iter(self.spawn_events.clone()).map(Ok).boxed()
    }

    async fn run_python(&self, code: &str) -> Result<String, ClientError> {
        self.calls.record("run_python");
        lock(&self.scripts).push(code.to_string());
        Ok(self.python_output.clone())
    }

    async fn head(&self, url: &str) -> Result<u16, ClientError> {
        self.calls.record(format!("head {url}"));
        Ok(self.head_status)
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(&'static str, String)],
    ) -> Result<u16, ClientError> {
        self.calls.record(format!("post_json {url}"));
        lock(&self.posts).push(RecordedPost {
            url: url.to_string(),
            body: body.clone(),
            headers: headers.to_vec(),
        });
        Ok(self.post_status)
    }

    fn xsrf_token(&self) -> Option<String> {
        self.xsrf.clone()
    }
}

// ============================================================================
// Mock Client Factory
// ============================================================================

/// A [`LabClientFactory`] that hands every caller the same client.
pub struct MockClientFactory {
    client: Arc<dyn LabClient>,
    reject: bool,
    delay: Option<Duration>,
    connects: CallLog,
}

impl MockClientFactory {
    /// Hand out `client` on every connect.
    pub fn new(client: Arc<dyn LabClient>) -> Self {
        Self {
            client,
            reject: false,
            delay: None,
            connects: CallLog::new(),
        }
    }

    /// Reject every token.
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::new(Arc::new(MockLabClient::new()))
        }
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Users that connected, in order.
    pub fn connects(&self) -> Vec<String> {
        self.connects.entries()
    }
}

#[async_trait]
impl LabClientFactory for MockClientFactory {
    async fn connect(&self, user: &str, _token: &str) -> Result<Arc<dyn LabClient>, ClientError> {
        self.connects.record(user);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.reject {
            return Err(ClientError::Unauthorized {
                user: user.to_string(),
            });
        }
        Ok(Arc::clone(&self.client))
    }
}

// ============================================================================
// Hooks
// ============================================================================

/// A hook that records its label and the context it saw, then declines to
/// change it.
///
/// # Example
///
/// ```rust,ignore
/// let log = CallLog::new();
/// let first = RecordingHook::new("first", log.clone());
/// let second = RecordingHook::new("second", log.clone());
/// // ... run both ...
/// assert_eq!(log.entries(), vec!["first", "second"]);
/// ```
#[derive(Clone)]
pub struct RecordingHook {
    label: String,
    log: CallLog,
    seen: Arc<Mutex<Vec<Parameters>>>,
}

impl RecordingHook {
    /// Create a hook that appends `label` to `log` when run.
    pub fn new(label: impl Into<String>, log: CallLog) -> Self {
        Self {
            label: label.into(),
            log,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Contexts received, in call order.
    pub fn seen(&self) -> Vec<Parameters> {
        lock(&self.seen).clone()
    }

    /// Number of times this hook ran.
    pub fn count(&self) -> usize {
        lock(&self.seen).len()
    }
}

impl Hook for RecordingHook {
    async fn apply(&self, params: &Parameters) -> HookOutcome {
        self.log.record(self.label.clone());
        lock(&self.seen).push(params.clone());
        HookOutcome::Unchanged
    }
}

/// A hook that always fails with a fixed message.
#[derive(Clone)]
pub struct FailingHook {
    message: String,
    log: Option<(String, CallLog)>,
}

impl FailingHook {
    /// Create a hook failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            log: None,
        }
    }

    /// Also append `label` to `log` when run.
    pub fn recording(mut self, label: impl Into<String>, log: CallLog) -> Self {
        self.log = Some((label.into(), log));
        self
    }
}

impl Hook for FailingHook {
    async fn apply(&self, _params: &Parameters) -> HookOutcome {
        if let Some((label, log)) = &self.log {
            log.record(label.clone());
        }
        HookOutcome::failed(self.message.clone())
    }
}

/// A hook backed by a synchronous closure.
///
/// # Example
///
/// ```rust,ignore
/// let hook = FnHook::new(|p: &Parameters| {
///     HookOutcome::Replaced(p.clone().with_unique_id(Some("2".into())))
/// });
/// ```
pub struct FnHook<F> {
    f: F,
}

impl<F> FnHook<F>
where
    F: Fn(&Parameters) -> HookOutcome + Send + Sync + 'static,
{
    /// Wrap `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Hook for FnHook<F>
where
    F: Fn(&Parameters) -> HookOutcome + Send + Sync + 'static,
{
    async fn apply(&self, params: &Parameters) -> HookOutcome {
        (self.f)(params)
    }
}

/// A hook that sleeps for a fixed duration, then declines to change the
/// context.
#[derive(Clone)]
pub struct SlowHook {
    delay: Duration,
}

impl SlowHook {
    /// Create a hook sleeping for `delay`.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Hook for SlowHook {
    async fn apply(&self, _params: &Parameters) -> HookOutcome {
        tokio::time::sleep(self.delay).await;
        HookOutcome::Unchanged
    }
}

/// Build a context for `path` backed by `client`, with fixed identity fields.
pub fn params_for(path: &str, target: &str, client: Arc<dyn LabClient>) -> Parameters {
    Parameters::new(
        "https://data.example.org",
        "rachel",
        path,
        target,
        client,
        "token-of-affection",
    )
}
