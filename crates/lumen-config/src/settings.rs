//! The harness configuration document.

use std::collections::BTreeMap;
use std::fs;
use std::iter;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::defaults::{default_backend_plugin_string, default_log_format, default_log_level};
use crate::error::ConfigError;
use crate::logging::{LogFormat, LogLevel};

/// Settings read from `lumen_config.yml`.
///
/// Every key is optional. Unknown keys are rejected so that a misspelt
/// setting fails loudly instead of being silently ignored.
///
/// ```yaml
/// test_timeout: 60.0
/// backend_plugin: default
/// backend_selection: fake_quito
/// default_log_level: INFO
/// module_log_level:
///   lumen_plugins: DEBUG
/// log_format: compact
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    test_timeout: Option<f64>,
    #[serde(default = "default_backend_plugin_string")]
    backend_plugin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backend_selection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backend_script: Option<Utf8PathBuf>,
    #[serde(default = "default_log_level")]
    default_log_level: LogLevel,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    module_log_level: BTreeMap<String, LogLevel>,
    #[serde(default = "default_log_format")]
    log_format: LogFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    log_file: Option<Utf8PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            test_timeout: None,
            backend_plugin: default_backend_plugin_string(),
            backend_selection: None,
            backend_script: None,
            default_log_level: default_log_level(),
            module_log_level: BTreeMap::new(),
            log_format: default_log_format(),
            log_file: None,
        }
    }
}

impl HarnessConfig {
    /// Parses and validates a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyDocument`] when the document holds no
    /// settings, [`ConfigError::Parse`] for syntax errors, unknown keys or
    /// wrongly typed values, and [`ConfigError::InvalidValue`] for values
    /// that parse but cannot be used.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if is_blank_document(text) {
            return Err(ConfigError::EmptyDocument);
        }
        let config: Self = serde_saphyr::from_str(text).map_err(|error| ConfigError::Parse {
            message: error.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read, or
    /// [`ConfigError::InFile`] wrapping any error from
    /// [`HarnessConfig::from_yaml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        Self::from_yaml_str(&text).map_err(|error| error.in_file(path))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend_plugin.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "backend_plugin",
                message: String::from("plugin name must not be empty"),
            });
        }
        if let Some(seconds) = self.test_timeout
            && !seconds.is_finite()
        {
            return Err(ConfigError::InvalidValue {
                key: "test_timeout",
                message: format!("{seconds} is not a finite number of seconds"),
            });
        }
        if let Some(module) = self
            .module_log_level
            .keys()
            .find(|module| module.trim().is_empty())
        {
            return Err(ConfigError::InvalidValue {
                key: "module_log_level",
                message: format!("module name '{module}' must not be blank"),
            });
        }
        Ok(())
    }

    /// Sets the test timeout in seconds.
    #[must_use]
    pub const fn with_test_timeout(mut self, seconds: f64) -> Self {
        self.test_timeout = Some(seconds);
        self
    }

    /// Sets the plugin consulted when no script is configured.
    #[must_use]
    pub fn with_backend_plugin(mut self, name: impl Into<String>) -> Self {
        self.backend_plugin = name.into();
        self
    }

    /// Sets the selection string handed to the provider.
    #[must_use]
    pub fn with_backend_selection(mut self, selection: impl Into<String>) -> Self {
        self.backend_selection = Some(selection.into());
        self
    }

    /// Sets the backend script that overrides plugin lookup.
    #[must_use]
    pub fn with_backend_script(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.backend_script = Some(path.into());
        self
    }

    /// Sets the verbosity applied to modules without their own level.
    #[must_use]
    pub const fn with_default_log_level(mut self, level: LogLevel) -> Self {
        self.default_log_level = level;
        self
    }

    /// Sets the verbosity of one module.
    #[must_use]
    pub fn with_module_log_level(mut self, module: impl Into<String>, level: LogLevel) -> Self {
        self.module_log_level.insert(module.into(), level);
        self
    }

    /// Sets the log output format.
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Sets a file that receives a copy of the log output.
    #[must_use]
    pub fn with_log_file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Configured test timeout in seconds, if any.
    #[must_use]
    pub const fn test_timeout_secs(&self) -> Option<f64> {
        self.test_timeout
    }

    /// Configured test timeout, when it is a positive duration.
    ///
    /// Zero and negative values disable the timeout.
    #[must_use]
    pub fn test_timeout(&self) -> Option<Duration> {
        self.test_timeout
            .filter(|seconds| *seconds > 0.0)
            .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
    }

    /// Plugin consulted when no script is configured.
    #[must_use]
    pub fn backend_plugin(&self) -> &str {
        &self.backend_plugin
    }

    /// Selection string handed to the provider, if any.
    #[must_use]
    pub fn backend_selection(&self) -> Option<&str> {
        self.backend_selection.as_deref()
    }

    /// Backend script overriding plugin lookup.
    ///
    /// An empty path counts as unset.
    #[must_use]
    pub fn backend_script(&self) -> Option<&Utf8Path> {
        self.backend_script
            .as_deref()
            .filter(|path| !path.as_str().trim().is_empty())
    }

    /// Verbosity of modules without their own level.
    #[must_use]
    pub const fn default_log_level(&self) -> LogLevel {
        self.default_log_level
    }

    /// Per-module verbosity overrides.
    #[must_use]
    pub const fn module_log_levels(&self) -> &BTreeMap<String, LogLevel> {
        &self.module_log_level
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// File receiving a copy of the log output.
    #[must_use]
    pub fn log_file(&self) -> Option<&Utf8Path> {
        self.log_file.as_deref()
    }

    /// Filter expression combining the default and per-module levels.
    ///
    /// The result is suitable for `tracing_subscriber::EnvFilter`, for
    /// example `info,lumen_plugins=debug`.
    #[must_use]
    pub fn log_filter(&self) -> String {
        let overrides = self
            .module_log_level
            .iter()
            .map(|(module, level)| format!("{}={}", module.trim(), level.directive()));
        iter::once(self.default_log_level.directive().to_owned())
            .chain(overrides)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Returns `true` when `text` holds nothing but whitespace, comments, and
/// document markers.
fn is_blank_document(text: &str) -> bool {
    text.lines().map(str::trim).all(|line| {
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..." || line == "~"
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn fully_populated_document_parses() {
        let config = HarnessConfig::from_yaml_str(
            "---\n\
             test_timeout: 60.0\n\
             backend_plugin: vendor\n\
             backend_selection: fake_quito\n\
             backend_script: /tmp/backend.sh\n",
        )
        .expect("document parses");
        assert_eq!(config.test_timeout_secs(), Some(60.0));
        assert_eq!(config.test_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.backend_plugin(), "vendor");
        assert_eq!(config.backend_selection(), Some("fake_quito"));
        assert_eq!(
            config.backend_script(),
            Some(Utf8Path::new("/tmp/backend.sh"))
        );
        assert_eq!(config.default_log_level(), LogLevel::Info);
        assert_eq!(config.log_format(), LogFormat::Json);
    }

    #[test]
    fn defaults_fill_omitted_keys() {
        let config = HarnessConfig::from_yaml_str("backend_selection: method=stabilizer\n")
            .expect("document parses");
        assert_eq!(config.backend_plugin(), "default");
        assert_eq!(config.backend_script(), None);
        assert_eq!(config.test_timeout(), None);
        assert_eq!(config.log_filter(), "info");
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("   \n\n")]
    #[case::marker_only("---\n")]
    #[case::comments_only("# nothing here\n---\n# still nothing\n")]
    fn blank_documents_are_rejected(#[case] text: &str) {
        let error = HarnessConfig::from_yaml_str(text).expect_err("blank document");
        assert!(matches!(error, ConfigError::EmptyDocument));
    }

    #[rstest]
    #[case::timeout_with_units("test_timeout: 60 seconds\n")]
    #[case::unknown_key("backend_plugins: default\n")]
    #[case::unknown_level("default_log_level: VERBOSE\n")]
    #[case::unknown_format("log_format: pretty\n")]
    #[case::list_for_map("module_log_level: [DEBUG]\n")]
    fn malformed_documents_are_rejected(#[case] text: &str) {
        let error = HarnessConfig::from_yaml_str(text).expect_err("malformed document");
        assert!(
            matches!(error, ConfigError::Parse { .. }),
            "unexpected error: {error:?}"
        );
    }

    #[test]
    fn blank_plugin_name_is_invalid() {
        let error =
            HarnessConfig::from_yaml_str("backend_plugin: \"  \"\n").expect_err("blank plugin");
        assert!(matches!(
            error,
            ConfigError::InvalidValue {
                key: "backend_plugin",
                ..
            }
        ));
    }

    #[test]
    fn module_levels_extend_the_filter() {
        let config = HarnessConfig::from_yaml_str(
            "default_log_level: WARNING\n\
             module_log_level:\n  \
               lumen_plugins: DEBUG\n  \
               lumen_lifecycle: CRITICAL\n",
        )
        .expect("document parses");
        assert_eq!(
            config.log_filter(),
            "warn,lumen_lifecycle=error,lumen_plugins=debug"
        );
    }

    #[rstest]
    #[case(0.0)]
    #[case(-5.0)]
    fn non_positive_timeout_disables_it(#[case] seconds: f64) {
        let config = HarnessConfig::default().with_test_timeout(seconds);
        assert_eq!(config.test_timeout(), None);
    }

    #[test]
    fn empty_script_path_counts_as_unset() {
        let config = HarnessConfig::default().with_backend_script("");
        assert_eq!(config.backend_script(), None);
    }

    #[test]
    fn builders_round_out_the_document() {
        let config = HarnessConfig::default()
            .with_backend_plugin("vendor")
            .with_backend_selection("fake_lima")
            .with_log_format(LogFormat::Compact)
            .with_default_log_level(LogLevel::Debug)
            .with_module_log_level("lumen_config", LogLevel::Error)
            .with_log_file("/var/log/lumen.log");
        assert_eq!(config.backend_plugin(), "vendor");
        assert_eq!(config.backend_selection(), Some("fake_lima"));
        assert_eq!(config.log_format(), LogFormat::Compact);
        assert_eq!(config.log_filter(), "debug,lumen_config=error");
        assert_eq!(config.log_file(), Some(Utf8Path::new("/var/log/lumen.log")));
    }

    #[test]
    fn read_failure_names_the_file() {
        let error = HarnessConfig::load(Path::new("/nonexistent/lumen_config.yml"))
            .expect_err("file is missing");
        assert!(matches!(error, ConfigError::Read { .. }));
        assert!(error.to_string().contains("/nonexistent/lumen_config.yml"));
    }

    #[test]
    fn document_errors_are_attributed_to_their_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("lumen_config.yml");
        fs::write(&path, "").expect("write config");
        let error = HarnessConfig::load(&path).expect_err("empty file");
        assert!(matches!(error, ConfigError::InFile { .. }));
        assert!(matches!(error.root_cause(), ConfigError::EmptyDocument));
    }
}
