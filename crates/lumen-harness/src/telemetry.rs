//! Structured telemetry initialisation for test runs.

use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lumen_config::{DEFAULT_LOG_FILTER, HarnessConfig, LogFormat, default_log_format};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, debug, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

const TELEMETRY_TARGET: &str = "lumen_harness::telemetry";

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to open the configured log file.
    #[error("failed to open log file '{}': {source}", path.display())]
    LogFile {
        /// Configured log file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Settings derived from the harness configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    filter: String,
    format: LogFormat,
    log_file: Option<PathBuf>,
}

impl TelemetrySettings {
    /// Derives settings from `config`, or the defaults when it is absent.
    #[must_use]
    pub fn from_config(config: Option<&HarnessConfig>) -> Self {
        config.map_or_else(
            || Self {
                filter: DEFAULT_LOG_FILTER.to_owned(),
                format: default_log_format(),
                log_file: None,
            },
            |settings| Self {
                filter: settings.log_filter(),
                format: settings.log_format(),
                log_file: settings
                    .log_file()
                    .map(|path| path.as_std_path().to_path_buf()),
            },
        )
    }

    /// Filter expression handed to `EnvFilter`.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Output format.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }

    /// File receiving a copy of the output.
    #[must_use]
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Repeated calls are idempotent: the first invocation installs the global
/// subscriber, and later ones return a fresh [`TelemetryHandle`] without
/// touching the global state again, even when their settings differ.
///
/// A subscriber installed elsewhere in the process, by an embedding binary
/// or the test runner, is left in place and counts as initialised.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or the log file
/// cannot be opened.
pub fn initialise(settings: &TelemetrySettings) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| match install_subscriber(settings) {
            Err(TelemetryError::Subscriber(error)) => {
                debug!(
                    target: TELEMETRY_TARGET,
                    %error,
                    "keeping the tracing subscriber installed by the host"
                );
                Ok(())
            }
            outcome => outcome,
        })
        .map(|_| TelemetryHandle)
}

fn install_subscriber(settings: &TelemetrySettings) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(settings.filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;
    let log_file = settings.log_file().map(open_log_file).transpose()?;
    // Colour codes would leak into the log file.
    let ansi = log_file.is_none() && io::stderr().is_terminal();
    let writer = match log_file {
        Some(file) => BoxMakeWriter::new(io::stderr.and(Arc::new(file))),
        None => BoxMakeWriter::new(io::stderr),
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match settings.format() {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

fn open_log_file(path: &Path) -> Result<File, TelemetryError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| TelemetryError::LogFile {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })
}
