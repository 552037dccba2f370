use crate::logging::{LogFormat, LogLevel};

/// Plugin consulted when the configuration names none.
pub const DEFAULT_BACKEND_PLUGIN: &str = "default";

/// Log filter used when no configuration file is found.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Plugin consulted when the configuration names none.
#[must_use]
pub const fn default_backend_plugin() -> &'static str {
    DEFAULT_BACKEND_PLUGIN
}

/// Log filter used when no configuration file is found.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned plugin name used where allocation is required (e.g. serde).
pub(crate) fn default_backend_plugin_string() -> String {
    DEFAULT_BACKEND_PLUGIN.to_owned()
}

/// Default verbosity for every module without an explicit level.
#[must_use]
pub const fn default_log_level() -> LogLevel {
    LogLevel::Info
}

/// Default output format for harness logs.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
