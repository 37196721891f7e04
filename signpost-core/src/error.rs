//! Error types for signpost.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`ResolveError`] - Per-request failure returned by route resolution
//! - [`ConfigError`] - Load-time failure; the process must refuse to start
//! - [`ClientError`] - Failure talking to the remote lab environment
//! - [`HookError`] - Reasons a standard hook gives when it fails
//! - [`TemplateError`] - Malformed or unknown placeholders in a target

use crate::context::ImmutableField;
use std::{fmt, time::Duration};
use thiserror::Error;

/// A boxed error type for opaque failure reasons.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of a [`ResolveError`].
///
/// The HTTP layer maps this to a status code and a user-visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No configured route matched the request path.
    NotFound,
    /// An authenticated client for the lab environment could not be built.
    UpstreamUnavailable,
    /// A hook declared failure (or timed out).
    HookFailure,
    /// A hook changed a field it was not allowed to change.
    PolicyViolation,
    /// The final target could not be turned into a redirect URL.
    Resolution,
}

impl FailureKind {
    /// HTTP status code conventionally used for this kind of failure.
    pub const fn status_code(self) -> u16 {
        match self {
            FailureKind::NotFound => 404,
            FailureKind::UpstreamUnavailable => 502,
            FailureKind::HookFailure | FailureKind::PolicyViolation | FailureKind::Resolution => {
                500
            }
        }
    }
}

/// Errors returned when resolving a single request.
///
/// All of these are terminal for the request: the caller issues an error
/// response instead of a redirect.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No configured `source_prefix` is a prefix of the request path.
    #[error("no route matches {path}")]
    NotFound {
        /// The request path as received.
        path: String,
    },

    /// The lab client could not be constructed for this user and token.
    #[error("lab environment unavailable: {0}")]
    UpstreamUnavailable(#[source] ClientError),

    /// A hook signalled failure; later hooks did not run.
    #[error("hook `{hook}` failed: {reason}")]
    HookFailed {
        /// Registered name of the failing hook.
        hook: String,
        /// Reason given by the hook.
        #[source]
        reason: BoxError,
    },

    /// A hook returned a context that changed an immutable field.
    #[error("hook `{hook}` attempted to change immutable {}", FieldList(.fields))]
    PolicyViolation {
        /// Registered name of the misbehaving hook.
        hook: String,
        /// Every immutable field that differed.
        fields: Vec<ImmutableField>,
    },

    /// The final target could not be substituted.
    #[error("cannot resolve target: {0}")]
    Template(#[from] TemplateError),

    /// The substituted target is not an absolute URL.
    #[error("resolved target `{target}` is not a valid URL: {reason}")]
    InvalidTarget {
        /// The substituted target string.
        target: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ResolveError {
    /// Classify this error for the HTTP layer.
    pub fn kind(&self) -> FailureKind {
        match self {
            ResolveError::NotFound { .. } => FailureKind::NotFound,
            ResolveError::UpstreamUnavailable(_) => FailureKind::UpstreamUnavailable,
            ResolveError::HookFailed { .. } => FailureKind::HookFailure,
            ResolveError::PolicyViolation { .. } => FailureKind::PolicyViolation,
            ResolveError::Template(_) | ResolveError::InvalidTarget { .. } => {
                FailureKind::Resolution
            }
        }
    }

    /// Name of the hook responsible, if a hook caused the failure.
    pub fn hook(&self) -> Option<&str> {
        match self {
            ResolveError::HookFailed { hook, .. } | ResolveError::PolicyViolation { hook, .. } => {
                Some(hook.as_str())
            }
            _ => None,
        }
    }
}

/// Errors detected while loading configuration or building a route table.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A route names a hook that is not in the registry.
    #[error("route {route}: hook `{hook}` is not registered")]
    UnknownHook {
        /// Canonical source prefix of the route.
        route: String,
        /// The unresolvable hook name.
        hook: String,
    },

    /// Two routes share the same canonical source prefix.
    #[error("source prefix {prefix} is configured more than once")]
    AmbiguousPrefix {
        /// The duplicated canonical prefix.
        prefix: String,
    },

    /// A source prefix could not be canonicalized.
    #[error("invalid source prefix `{prefix}`: {reason}")]
    InvalidPrefix {
        /// The prefix as configured.
        prefix: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A route's target template is malformed or uses an unknown placeholder.
    #[error("route {route}: {source}")]
    Template {
        /// Canonical source prefix of the route.
        route: String,
        /// The parse failure.
        #[source]
        source: TemplateError,
    },

    /// The environment base URL is missing or not an absolute URL.
    #[error("invalid environment URL `{url}`: {reason}")]
    InvalidBaseUrl {
        /// The configured value.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A required setting was not provided by any source.
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    /// A setting had a value that could not be interpreted.
    #[error("invalid value `{value}` for `{key}`")]
    InvalidValue {
        /// Setting name.
        key: &'static str,
        /// Offending value.
        value: String,
    },

    /// A configuration file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path of the file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("cannot parse {path}: {source}")]
    Parse {
        /// Path (or description) of the document.
        path: String,
        /// Underlying parser error.
        #[source]
        source: BoxError,
    },
}

/// Errors from the remote lab environment.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The service could not be reached.
    #[error("lab service unreachable: {0}")]
    Unreachable(#[source] BoxError),

    /// The delegated token was rejected.
    #[error("token rejected for user {user}")]
    Unauthorized {
        /// The user the token was presented for.
        user: String,
    },

    /// The service answered with an unexpected status.
    #[error("unexpected HTTP status {status} from {url}")]
    Status {
        /// Status code returned.
        status: u16,
        /// Request URL.
        url: String,
    },

    /// Code executed inside the lab raised an error.
    #[error("lab execution failed: {0}")]
    Execution(String),

    /// The operation did not complete in time.
    #[error("lab operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors raised by the standard hooks.
#[derive(Error, Debug)]
pub enum HookError {
    /// The hook did not complete within its time budget.
    #[error("hook timed out after {0:?}")]
    Timeout(Duration),

    /// A call to the lab environment failed.
    #[error(transparent)]
    Lab(#[from] ClientError),

    /// The request path cannot be handled by this hook.
    #[error("unsupported path `{path}`: {reason}")]
    InvalidPath {
        /// Residual request path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A custom hook error.
    #[error(transparent)]
    Custom(BoxError),
}

impl From<BoxError> for HookError {
    fn from(err: BoxError) -> Self {
        HookError::Custom(err)
    }
}

/// Errors from parsing or rendering a target template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// `${name}` or `$name` where `name` is not a recognized placeholder.
    #[error("unknown placeholder `{name}` in `{template}`")]
    UnknownPlaceholder {
        /// The placeholder name.
        name: String,
        /// The full template.
        template: String,
    },

    /// A `$` not followed by `$`, `{name}`, or an identifier.
    #[error("malformed placeholder at byte {offset} in `{template}`")]
    Malformed {
        /// Byte offset of the offending `$`.
        offset: usize,
        /// The full template.
        template: String,
    },
}

struct FieldList<'a>(&'a [ImmutableField]);

impl fmt::Display for FieldList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.0.len() == 1 {
            "parameter"
        } else {
            "parameters"
        };
        write!(f, "{noun}: ")?;
        for (i, field) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}")?;
        }
        Ok(())
    }
}
