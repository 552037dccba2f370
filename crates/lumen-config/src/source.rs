//! Sources of resolved harness configuration.

use tracing::info;

use crate::discovery::ConfigDiscovery;
use crate::error::ConfigError;
use crate::settings::HarnessConfig;

const SOURCE_TARGET: &str = "lumen_config::source";

/// Supplies the validated configuration for a test run.
pub trait ConfigSource {
    /// Loads the configuration.
    ///
    /// `Ok(None)` means no configuration exists and defaults apply.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a configuration exists but cannot be
    /// read or validated.
    fn load(&self) -> Result<Option<HarnessConfig>, ConfigError>;
}

/// Configuration found on the filesystem through [`ConfigDiscovery`].
#[derive(Debug, Clone, Default)]
pub struct DiscoveredConfig {
    discovery: ConfigDiscovery,
}

impl DiscoveredConfig {
    /// Creates a source searching the locations of `discovery`.
    #[must_use]
    pub const fn new(discovery: ConfigDiscovery) -> Self {
        Self { discovery }
    }

    /// Creates a source searching the standard locations.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ConfigDiscovery::from_env())
    }

    /// Search order used by this source.
    #[must_use]
    pub const fn discovery(&self) -> &ConfigDiscovery {
        &self.discovery
    }
}

impl ConfigSource for DiscoveredConfig {
    fn load(&self) -> Result<Option<HarnessConfig>, ConfigError> {
        let Some(path) = self.discovery.locate() else {
            return Ok(None);
        };
        info!(
            target: SOURCE_TARGET,
            path = %path.display(),
            "loading configuration file"
        );
        HarnessConfig::load(&path).map(Some)
    }
}

/// A fixed configuration, for embedding and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticConfig {
    config: Option<HarnessConfig>,
}

impl StaticConfig {
    /// Creates a source that always yields `config`.
    #[must_use]
    pub const fn new(config: HarnessConfig) -> Self {
        Self {
            config: Some(config),
        }
    }

    /// Creates a source that never yields a configuration.
    #[must_use]
    pub const fn empty() -> Self {
        Self { config: None }
    }
}

impl ConfigSource for StaticConfig {
    fn load(&self) -> Result<Option<HarnessConfig>, ConfigError> {
        Ok(self.config.clone())
    }
}
