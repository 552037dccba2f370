//! Configuration loading for the lumen test harness.
//!
//! Harness settings live in a YAML document, `lumen_config.yml`, found
//! through [`ConfigDiscovery`]. The document is parsed into a
//! [`HarnessConfig`] which rejects unknown keys and wrongly typed values.
//! Consumers read settings through the [`ConfigSource`] trait so tests can
//! substitute a [`StaticConfig`] for the filesystem-backed
//! [`DiscoveredConfig`].

mod defaults;
mod discovery;
mod error;
mod logging;
mod settings;
mod source;
mod timeout;

pub use defaults::{
    DEFAULT_BACKEND_PLUGIN, DEFAULT_LOG_FILTER, default_backend_plugin, default_log_filter,
    default_log_format, default_log_level,
};
pub use discovery::{CONFIG_FILE_NAME, CONFIG_PATH_ENV, ConfigDiscovery};
pub use error::ConfigError;
pub use logging::{LogFormat, LogFormatParseError, LogLevel};
pub use settings::HarnessConfig;
pub use source::{ConfigSource, DiscoveredConfig, StaticConfig};
pub use timeout::{TEST_TIMEOUT_ENV, resolve_test_timeout, test_timeout_from_env};
