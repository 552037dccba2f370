use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] or [`LogLevel`] from
/// text.
pub type LogFormatParseError = strum::ParseError;

/// Verbosity accepted for `default_log_level` and `module_log_level`.
///
/// Levels are spelled in upper case in configuration files. `WARNING` and
/// `CRITICAL` have no direct `tracing` counterpart and map onto `warn` and
/// `error` respectively.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Deserialize,
    Serialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    EnumString,
    Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Routine progress.
    #[default]
    Info,
    /// Unexpected but recoverable conditions.
    Warning,
    /// Failures of a single operation.
    Error,
    /// Failures that abort the run.
    Critical,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    #[must_use]
    pub const fn directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}
