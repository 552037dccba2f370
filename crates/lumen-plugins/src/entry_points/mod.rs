//! Name-keyed table of backend provider factories.
//!
//! Plugins register a factory under a unique name before the registry loads.
//! [`EntryPoints`] values can be built explicitly, which is how tests and
//! embedders assemble a fixed set, or taken from the process-wide table that
//! plugin crates populate through [`register_global`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::Lazy;
use tracing::debug;

use crate::error::PluginError;
use crate::provider::BackendProvider;

/// Tracing target for plugin registration.
const ENTRY_POINTS_TARGET: &str = "lumen_plugins::entry_points";

/// Result produced by a provider factory.
pub type FactoryResult = Result<Box<dyn BackendProvider>, PluginError>;

/// Factory producing a provider when the registry loads.
pub type ProviderFactory = Arc<dyn Fn() -> FactoryResult + Send + Sync>;

static GLOBAL: Lazy<Mutex<EntryPoints>> = Lazy::new(|| Mutex::new(EntryPoints::new()));

/// Registered provider factories, keyed by unique name.
///
/// # Example
///
/// ```
/// use lumen_plugins::{BackendDescriptor, DescribedBackend, EntryPoints, PluginError};
///
/// let mut entry_points = EntryPoints::new();
/// entry_points
///     .register("x", || Ok(Box::new(Fixed) as _))
///     .expect("first registration");
/// assert!(entry_points.register("x", || Ok(Box::new(Fixed) as _)).is_err());
///
/// struct Fixed;
/// impl lumen_plugins::BackendProvider for Fixed {
///     fn get_backend(
///         &self,
///         _selection: Option<&str>,
///     ) -> Result<Box<dyn lumen_plugins::Backend>, PluginError> {
///         Ok(Box::new(DescribedBackend::new(BackendDescriptor::new("fixed"))))
///     }
/// }
/// ```
#[derive(Clone, Default)]
pub struct EntryPoints {
    factories: BTreeMap<String, ProviderFactory>,
}

impl EntryPoints {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `plugin`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::DuplicateRegistration`] if `plugin` is taken.
    pub fn register<F>(&mut self, plugin: impl Into<String>, factory: F) -> Result<(), PluginError>
    where
        F: Fn() -> FactoryResult + Send + Sync + 'static,
    {
        let name = plugin.into();
        if self.factories.contains_key(&name) {
            return Err(PluginError::DuplicateRegistration { name });
        }
        debug!(
            target: ENTRY_POINTS_TARGET,
            plugin = %name,
            "registered backend provider factory"
        );
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Registered factories in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProviderFactory)> {
        self.factories
            .iter()
            .map(|(name, factory)| (name.as_str(), factory))
    }

    /// Number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for EntryPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoints")
            .field("names", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

/// Registers `factory` in the process-wide table.
///
/// # Errors
///
/// Returns [`PluginError::DuplicateRegistration`] if `name` is taken.
pub fn register_global<F>(name: impl Into<String>, factory: F) -> Result<(), PluginError>
where
    F: Fn() -> FactoryResult + Send + Sync + 'static,
{
    GLOBAL
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .register(name, factory)
}

/// Snapshot of the process-wide table.
#[must_use]
pub fn global_entry_points() -> EntryPoints {
    GLOBAL
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}
