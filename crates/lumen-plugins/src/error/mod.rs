//! Domain errors raised by plugin loading and backend resolution.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to satisfy the `result_large_err` Clippy lint.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors arising from plugin registration, loading, and backend resolution.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A registered provider factory failed; the whole load is abandoned.
    #[error("backend plugin '{name}' failed to load: {source}")]
    LoadFailed {
        /// Registration name of the failing plugin.
        name: String,
        /// Error reported by the factory.
        #[source]
        source: Box<PluginError>,
    },

    /// The requested plugin name is absent from the loaded registry.
    #[error(
        "unknown backend plugin '{name}'; available plugins: [{}]",
        available.join(", ")
    )]
    UnknownPlugin {
        /// Name that was looked up.
        name: String,
        /// Names present in the registry, sorted.
        available: Vec<String>,
    },

    /// A provider rejected the selection string.
    #[error("invalid backend selection '{selection}': {message}")]
    InvalidSelection {
        /// Selection string as supplied.
        selection: String,
        /// Why the provider rejected it.
        message: String,
    },

    /// A provider factory was registered twice under one name.
    #[error("backend plugin '{name}' is already registered")]
    DuplicateRegistration {
        /// Conflicting registration name.
        name: String,
    },

    /// The registry was asked to load a second time.
    #[error("plugin registry is already loaded")]
    AlreadyLoaded,

    /// The configured backend script does not exist.
    #[error("backend script not found: {path}")]
    ScriptNotFound {
        /// Path that was checked.
        path: PathBuf,
    },

    /// The script process could not be spawned.
    #[error("backend script '{name}' failed to start: {message}")]
    SpawnFailed {
        /// Script identifier.
        name: String,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying I/O error.
        #[source]
        source: Option<Arc<std::io::Error>>,
    },

    /// The script did not answer within the configured timeout.
    #[error("backend script '{name}' timed out after {timeout_secs}s")]
    Timeout {
        /// Script identifier.
        name: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },

    /// The script exited with a non-zero status code.
    #[error("backend script '{name}' exited with non-zero status {status}")]
    NonZeroExit {
        /// Script identifier.
        name: String,
        /// Process exit status.
        status: i32,
    },

    /// The script request could not be serialized to JSON.
    #[error("failed to serialise backend script request: {0}")]
    SerializeRequest(#[source] serde_json::Error),

    /// The script response could not be deserialized from JSON.
    #[error("failed to deserialise backend script response: {message}")]
    DeserializeResponse {
        /// Human-readable description of the parse failure.
        message: String,
        /// Optional underlying JSON error.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The script produced output that does not conform to the protocol.
    #[error("backend script '{name}' wrote invalid output: {message}")]
    InvalidOutput {
        /// Script identifier.
        name: String,
        /// Description of the protocol violation.
        message: String,
    },

    /// The script reported a failure other than an invalid selection.
    #[error("backend script '{name}' failed: {message}")]
    ScriptFailed {
        /// Script identifier.
        name: String,
        /// Diagnostics reported by the script.
        message: String,
    },

    /// An I/O error occurred while communicating with the script process.
    #[error("I/O error communicating with backend script '{name}': {source}")]
    Io {
        /// Script identifier.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl PluginError {
    /// Builds an [`Self::InvalidSelection`] for `selection`.
    #[must_use]
    pub fn invalid_selection(selection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelection {
            selection: selection.into(),
            message: message.into(),
        }
    }
}
