//! Errors surfaced by the harness.

use lumen_config::ConfigError;
use lumen_lifecycle::LifecycleError;
use lumen_plugins::PluginError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

/// Errors raised while preparing, running, or checking a test case.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Class definition or lifecycle dispatch failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No backend could be resolved.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// Logging could not be configured.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// `set_up` ran a second time on one instance.
    #[error(
        "set_up was already called on '{class}'; do not call set_up from tests, \
         and call the ancestor set_up from your own set_up"
    )]
    SetUpRepeated {
        /// Class of the instance.
        class: String,
    },

    /// `tear_down` ran a second time on one instance.
    #[error(
        "tear_down was already called on '{class}'; do not call tear_down from tests, \
         and call the ancestor tear_down from your own tear_down"
    )]
    TearDownRepeated {
        /// Class of the instance.
        class: String,
    },

    /// Both `delta` and `places` were given for a numeric comparison.
    #[error("specify delta or places, not both")]
    ConflictingTolerance,

    /// Two numeric maps differ beyond the tolerance.
    #[error("maps are not almost equal: {message}")]
    NotAlmostEqual {
        /// Differing keys and the tolerance applied.
        message: String,
    },
}

impl HarnessError {
    /// Returns the harness error carried inside a failed lifecycle call.
    ///
    /// Base lifecycle bodies report their own failures as
    /// [`LifecycleError::Failed`]; this looks through that wrapping.
    #[must_use]
    pub fn harness_cause(&self) -> Option<&Self> {
        match self {
            Self::Lifecycle(error) => error.failure_source::<Self>(),
            _ => None,
        }
    }
}
