//! # Configuration
//!
//! Two documents configure the gateway:
//!
//! - [`Settings`]: process settings, read from an optional YAML file and then
//!   overridden from `SIGNPOST_*` environment variables.
//! - [`MappingFile`]: the route definitions, read from `mapping_path`.
//!
//! Both are checked at load time; a gateway never starts with a
//! configuration it cannot serve.
//!
//! # Example
//!
//! ```yaml
//! environment_url: https://data.example.org
//! mapping_path: /etc/signpost/routes.yaml
//! hook_timeout: 20
//! logging:
//!   profile: production
//!   level: info
//! ```

use serde::{Deserialize, Serialize};
use signpost_core::ConfigError;
use signpost_std::routing::RouteDefinition;
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use url::Url;

/// Default mount point of the HTTP surface.
pub const DEFAULT_PATH_PREFIX: &str = "/signpost";

/// Default bound on lab calls, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Environment variables read by [`Settings::apply_env`].
pub mod env {
    /// Base URL of the environment.
    pub const ENVIRONMENT_URL: &str = "SIGNPOST_ENVIRONMENT_URL";
    /// Path of the route mapping file.
    pub const MAPPING_PATH: &str = "SIGNPOST_MAPPING_PATH";
    /// Mount point of the HTTP surface.
    pub const PATH_PREFIX: &str = "SIGNPOST_PATH_PREFIX";
    /// Log level directive.
    pub const LOG_LEVEL: &str = "SIGNPOST_LOG_LEVEL";
    /// `development` or `production`.
    pub const LOGGING_PROFILE: &str = "SIGNPOST_LOGGING_PROFILE";
    /// Per-hook timeout in seconds.
    pub const HOOK_TIMEOUT: &str = "SIGNPOST_HOOK_TIMEOUT";
    /// Client construction timeout in seconds.
    pub const CLIENT_TIMEOUT: &str = "SIGNPOST_CLIENT_TIMEOUT";

    /// Every variable, in the order they are applied.
    pub const ALL: [&str; 7] = [
        ENVIRONMENT_URL,
        MAPPING_PATH,
        PATH_PREFIX,
        LOG_LEVEL,
        LOGGING_PROFILE,
        HOOK_TIMEOUT,
        CLIENT_TIMEOUT,
    ];
}

// ============================================================================
// Logging
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Human-readable lines.
    #[default]
    Development,
    /// One JSON object per line.
    Production,
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(Profile::Development),
            "production" => Ok(Profile::Production),
            _ => Err(ConfigError::InvalidValue {
                key: env::LOGGING_PROFILE,
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Profile::Development => "development",
            Profile::Production => "production",
        })
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Output format.
    pub profile: Profile,
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            profile: Profile::Development,
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Process settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Base URL of the environment, e.g. `https://data.example.org`.
    pub environment_url: Option<String>,
    /// Path of the YAML route mapping.
    pub mapping_path: Option<PathBuf>,
    /// Mount point of the HTTP surface.
    pub path_prefix: String,
    /// Per-hook time budget, in seconds.
    #[serde(rename = "hook_timeout")]
    pub hook_timeout_secs: u64,
    /// Time budget for building a lab client, in seconds.
    #[serde(rename = "client_timeout")]
    pub client_timeout_secs: u64,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment_url: None,
            mapping_path: None,
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
            hook_timeout_secs: DEFAULT_TIMEOUT_SECS,
            client_timeout_secs: DEFAULT_TIMEOUT_SECS,
            logging: LoggingSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
            path: "<settings>".to_string(),
            source: e.into(),
        })
    }

    /// Read settings from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = read(path)?;
        serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e.into(),
        })
    }

    /// Defaults, then `file` if given, then the process environment, then
    /// validation.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env()?.validate()
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_overrides(
            env::ALL
                .iter()
                .filter_map(|key| std::env::var(key).ok().map(|value| (*key, value))),
        )
    }

    /// Apply `(variable, value)` overrides.
    ///
    /// Unknown variables are ignored.
    pub fn apply_overrides<'k, I>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'k str, String)>,
    {
        for (key, value) in vars {
            match key {
                env::ENVIRONMENT_URL => self.environment_url = Some(value),
                env::MAPPING_PATH => self.mapping_path = Some(PathBuf::from(value)),
                env::PATH_PREFIX => self.path_prefix = value,
                env::LOG_LEVEL => self.logging.level = value,
                env::LOGGING_PROFILE => self.logging.profile = value.parse()?,
                env::HOOK_TIMEOUT => self.hook_timeout_secs = seconds(env::HOOK_TIMEOUT, &value)?,
                env::CLIENT_TIMEOUT => {
                    self.client_timeout_secs = seconds(env::CLIENT_TIMEOUT, &value)?
                }
                _ => {}
            }
        }
        Ok(self)
    }

    /// Check required settings and normalize values.
    ///
    /// `environment_url` must be an absolute `http(s)` URL; its trailing `/`
    /// is removed. `path_prefix` gets a leading `/` and loses any trailing
    /// one. Timeouts must be positive.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let raw = self
            .environment_url
            .take()
            .ok_or(ConfigError::Missing("environment_url"))?;
        self.environment_url = Some(normalize_base_url(&raw)?);

        if self.mapping_path.is_none() {
            return Err(ConfigError::Missing("mapping_path"));
        }

        let prefix = self.path_prefix.trim().trim_matches('/');
        self.path_prefix = format!("/{prefix}");

        self.check_timeouts()?;
        Ok(self)
    }

    /// Reject timeouts of zero seconds, which would fail every request.
    pub fn check_timeouts(&self) -> Result<(), ConfigError> {
        for (key, secs) in [
            ("hook_timeout", self.hook_timeout_secs),
            ("client_timeout", self.client_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key,
                    value: secs.to_string(),
                });
            }
        }
        Ok(())
    }

    /// The environment URL, or an error if unset.
    pub fn base_url(&self) -> Result<&str, ConfigError> {
        self.environment_url
            .as_deref()
            .ok_or(ConfigError::Missing("environment_url"))
    }

    /// The mapping file path, or an error if unset.
    pub fn mapping(&self) -> Result<&Path, ConfigError> {
        self.mapping_path
            .as_deref()
            .ok_or(ConfigError::Missing("mapping_path"))
    }

    /// Per-hook time budget.
    pub fn hook_timeout(&self) -> Duration {
        Duration::from_secs(self.hook_timeout_secs)
    }

    /// Client construction time budget.
    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn seconds(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

/// Validate `raw` as an absolute `http(s)` URL and drop trailing slashes.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
    }
    if url.host().is_none() {
        return Err(invalid("no host".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query or fragment not allowed".to_string()));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

// ============================================================================
// Route mapping
// ============================================================================

/// The route mapping document.
///
/// ```yaml
/// routes:
///   - source_prefix: /tutorials/
///     target: ${base_url}/nb/user/${user}/lab/tree/notebooks/tutorial-notebooks/${path}.ipynb
///     hooks:
///       - ensure_running_lab
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingFile {
    /// Routes in declaration order.
    #[serde(default)]
    pub routes: Vec<RouteDefinition>,
}

impl MappingFile {
    /// Parse a mapping from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
            path: "<mapping>".to_string(),
            source: e.into(),
        })
    }

    /// Read a mapping from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = read(path)?;
        serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn minimal() -> Settings {
        Settings {
            environment_url: Some("https://data.example.org/".to_string()),
            mapping_path: Some(PathBuf::from("/etc/signpost/routes.yaml")),
            ..Settings::default()
        }
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.path_prefix, "/signpost");
        assert_eq!(s.hook_timeout(), Duration::from_secs(20));
        assert_eq!(s.client_timeout(), Duration::from_secs(20));
        assert_eq!(s.logging.profile, Profile::Development);
    }

    #[test]
    fn test_yaml_settings() {
        let s = Settings::from_yaml_str(
            "environment_url: https://data.example.org\n\
             mapping_path: routes.yaml\n\
             hook_timeout: 5\n\
             logging:\n  profile: production\n",
        )
        .unwrap();
        assert_eq!(s.hook_timeout_secs, 5);
        assert_eq!(s.client_timeout_secs, 20);
        assert_eq!(s.logging.profile, Profile::Production);
        assert_eq!(s.logging.level, "info");
    }

    #[test]
    fn test_unknown_setting_rejected() {
        assert!(matches!(
            Settings::from_yaml_str("environmnet_url: x\n"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_overrides_win() {
        let s = minimal()
            .apply_overrides([
                (env::ENVIRONMENT_URL, "https://other.example.org".to_string()),
                (env::HOOK_TIMEOUT, "7".to_string()),
                (env::LOGGING_PROFILE, "Production".to_string()),
                (env::LOG_LEVEL, "signpost=debug".to_string()),
                ("UNRELATED", "ignored".to_string()),
            ])
            .unwrap();
        assert_eq!(s.environment_url.as_deref(), Some("https://other.example.org"));
        assert_eq!(s.hook_timeout_secs, 7);
        assert_eq!(s.logging.profile, Profile::Production);
        assert_eq!(s.logging.level, "signpost=debug");
    }

    #[test]
    fn test_bad_override_rejected() {
        let err = minimal()
            .apply_overrides([(env::CLIENT_TIMEOUT, "soon".to_string())])
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid value `soon` for `SIGNPOST_CLIENT_TIMEOUT`");
    }

    #[test]
    fn test_validate_normalizes() {
        let s = Settings {
            path_prefix: "signpost/".to_string(),
            ..minimal()
        }
        .validate()
        .unwrap();
        assert_eq!(s.base_url().unwrap(), "https://data.example.org");
        assert_eq!(s.path_prefix, "/signpost");
    }

    #[test]
    fn test_validate_requires_url_and_mapping() {
        let err = Settings::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("environment_url")));

        let err = Settings {
            mapping_path: None,
            ..minimal()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("mapping_path")));
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        for bad in ["data.example.org", "ftp://data.example.org", "https://x.org/?a=b"] {
            let err = Settings {
                environment_url: Some(bad.to_string()),
                ..minimal()
            }
            .validate()
            .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }), "{bad}");
        }
    }

    #[test]
    fn test_base_url_keeps_path() {
        assert_eq!(
            normalize_base_url("https://data.example.org/rsp/").unwrap(),
            "https://data.example.org/rsp"
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = Settings {
            hook_timeout_secs: 0,
            ..minimal()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "hook_timeout", .. }));
    }

    #[test]
    fn test_mapping_yaml() {
        let m = MappingFile::from_yaml_str(
            r#"
routes:
  - source_prefix: /tutorials/
    target: ${base_url}/nb/user/${user}/lab/tree/${path}.ipynb
    hooks: [ensure_running_lab]
  - source_prefix: /plain/
    target: ${base_url}/plain/${path}
"#,
        )
        .unwrap();
        assert_eq!(m.routes.len(), 2);
        assert_eq!(m.routes[0].hooks, vec!["ensure_running_lab"]);
        assert!(m.routes[1].hooks.is_empty());
    }

    #[test]
    fn test_mapping_missing_file() {
        let err = MappingFile::from_file("/nonexistent/signpost/routes.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
