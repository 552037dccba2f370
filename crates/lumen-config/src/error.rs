//! Errors raised while locating and parsing harness configuration.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors raised while locating, reading, or validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file '{}': {source}", path.display())]
    Read {
        /// File that was opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The document is not valid YAML for the configuration schema.
    #[error("malformed configuration: {message}")]
    Parse {
        /// Parser diagnostic.
        message: String,
    },

    /// The document holds no settings at all.
    #[error("configuration document is empty")]
    EmptyDocument,

    /// A key parsed but holds an unacceptable value.
    #[error("invalid value for '{key}': {message}")]
    InvalidValue {
        /// Offending key.
        key: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// A document-level error attributed to the file it came from.
    #[error("invalid configuration file '{}': {source}", path.display())]
    InFile {
        /// File the document was read from.
        path: PathBuf,
        /// Error raised for the document.
        #[source]
        source: Box<ConfigError>,
    },
}

impl ConfigError {
    /// Attributes a document-level error to `path`.
    pub(crate) fn in_file(self, path: impl Into<PathBuf>) -> Self {
        Self::InFile {
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, looking through file attribution.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::InFile { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
