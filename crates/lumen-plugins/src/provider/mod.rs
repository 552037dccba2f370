//! Capability provider contract implemented by every backend plugin.
//!
//! A provider turns an optional selection string into one backend. Providers
//! must accept any string without panicking and reject only selections they
//! genuinely do not recognise, using [`PluginError::InvalidSelection`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// Provider of compute backends registered under one plugin name.
///
/// # Example
///
/// ```
/// use lumen_plugins::{Backend, BackendDescriptor, BackendProvider, DescribedBackend, PluginError};
///
/// struct Single;
///
/// impl BackendProvider for Single {
///     fn get_backend(&self, selection: Option<&str>) -> Result<Box<dyn Backend>, PluginError> {
///         match selection.filter(|s| !s.is_empty()) {
///             None => Ok(Box::new(DescribedBackend::new(BackendDescriptor::new("single")))),
///             Some(other) => Err(PluginError::invalid_selection(other, "no alternatives")),
///         }
///     }
/// }
///
/// let backend = Single.get_backend(None).expect("default backend");
/// assert_eq!(backend.name(), "single");
/// assert!(Single.get_backend(Some("other")).is_err());
/// ```
pub trait BackendProvider {
    /// Returns the backend named by `selection`, or the default one when the
    /// selection is absent or empty.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidSelection`] for selections the provider
    /// does not recognise, or any error raised while producing the backend.
    fn get_backend(&self, selection: Option<&str>) -> Result<Box<dyn Backend>, PluginError>;
}

/// A resolved compute backend.
pub trait Backend: fmt::Debug {
    /// Display name of the backend.
    fn name(&self) -> &str;

    /// Serialisable description of the backend's configuration.
    fn descriptor(&self) -> BackendDescriptor;
}

/// Serialisable description of a backend.
///
/// Script providers return descriptors over the wire; in-process providers
/// expose one through [`Backend::descriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    num_qubits: Option<u32>,
    #[serde(default)]
    simulator: bool,
    #[serde(default)]
    noisy: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    options: BTreeMap<String, String>,
}

impl BackendDescriptor {
    /// Creates a descriptor for a noiseless device of unknown size.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            num_qubits: None,
            simulator: false,
            noisy: false,
            options: BTreeMap::new(),
        }
    }

    /// Sets the number of qubits the backend exposes.
    #[must_use]
    pub const fn with_qubits(mut self, num_qubits: u32) -> Self {
        self.num_qubits = Some(num_qubits);
        self
    }

    /// Marks the backend as a simulator.
    #[must_use]
    pub const fn simulator(mut self) -> Self {
        self.simulator = true;
        self
    }

    /// Marks the backend as carrying a noise model.
    #[must_use]
    pub const fn noisy(mut self) -> Self {
        self.noisy = true;
        self
    }

    /// Adds a backend option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Backend name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Number of qubits, when known.
    #[must_use]
    pub const fn num_qubits(&self) -> Option<u32> {
        self.num_qubits
    }

    /// Returns `true` for simulators.
    #[must_use]
    pub const fn is_simulator(&self) -> bool {
        self.simulator
    }

    /// Returns `true` when a noise model is attached.
    #[must_use]
    pub const fn is_noisy(&self) -> bool {
        self.noisy
    }

    /// Looks up a backend option.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

/// A backend known only through its descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribedBackend {
    descriptor: BackendDescriptor,
}

impl DescribedBackend {
    /// Wraps a descriptor.
    #[must_use]
    pub const fn new(descriptor: BackendDescriptor) -> Self {
        Self { descriptor }
    }
}

impl Backend for DescribedBackend {
    fn name(&self) -> &str {
        self.descriptor.name()
    }

    fn descriptor(&self) -> BackendDescriptor {
        self.descriptor.clone()
    }
}
