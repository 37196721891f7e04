//! Log subscriber setup.

use crate::config::{LoggingSettings, Profile};
use signpost_core::ConfigError;
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` if set, otherwise `settings.level`.
pub fn filter(settings: &LoggingSettings) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&settings.level).map_err(|_| ConfigError::InvalidValue {
        key: "logging.level",
        value: settings.level.clone(),
    })
}

/// Install the global subscriber.
///
/// Development prints human-readable lines, production prints JSON. Both
/// write to stderr. Calling this again after a subscriber is installed is a
/// no-op.
pub fn init(settings: &LoggingSettings) -> Result<(), ConfigError> {
    let filter = filter(settings)?;

    let installed = match settings.profile {
        Profile::Development => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init(),
        Profile::Production => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(profile = %settings.profile, level = %settings.level, "logging initialized");
    }
    Ok(())
}
