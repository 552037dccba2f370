//! Plugin registry holding one loaded provider per registration name.
//!
//! [`PluginRegistry::load_all`] instantiates every factory in an
//! [`EntryPoints`] table eagerly and exactly once. Loading is all or nothing:
//! if any factory fails, the failure is logged with the plugin name and
//! returned, and the registry stays empty.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::{debug, error};

use crate::entry_points::EntryPoints;
use crate::error::PluginError;
use crate::provider::{Backend, BackendProvider};

/// Tracing target for registry loading.
const REGISTRY_TARGET: &str = "lumen_plugins::registry";

/// Registry of loaded backend providers.
///
/// # Example
///
/// ```
/// use lumen_plugins::{
///     Backend, BackendDescriptor, BackendProvider, DescribedBackend, EntryPoints, PluginError,
///     PluginRegistry,
/// };
///
/// struct Fixed;
/// impl BackendProvider for Fixed {
///     fn get_backend(&self, _selection: Option<&str>) -> Result<Box<dyn Backend>, PluginError> {
///         Ok(Box::new(DescribedBackend::new(BackendDescriptor::new("fixed"))))
///     }
/// }
///
/// let mut entry_points = EntryPoints::new();
/// entry_points.register("fixed", || Ok(Box::new(Fixed) as _)).expect("register");
///
/// let mut registry = PluginRegistry::new();
/// registry.load_all(&entry_points).expect("load succeeds");
/// assert_eq!(registry.names(), vec!["fixed"]);
/// ```
#[derive(Default)]
pub struct PluginRegistry {
    providers: HashMap<String, Box<dyn BackendProvider>>,
    loaded: bool,
}

impl PluginRegistry {
    /// Creates an empty, unloaded registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiates every registered provider.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::AlreadyLoaded`] on a second call and
    /// [`PluginError::LoadFailed`] when any factory fails; in the latter
    /// case no provider is kept.
    pub fn load_all(&mut self, entry_points: &EntryPoints) -> Result<(), PluginError> {
        if self.loaded {
            return Err(PluginError::AlreadyLoaded);
        }
        self.loaded = true;
        let mut providers = HashMap::with_capacity(entry_points.len());
        for (name, factory) in entry_points.iter() {
            match factory() {
                Ok(provider) => {
                    providers.insert(name.to_owned(), provider);
                }
                Err(err) => {
                    error!(
                        target: REGISTRY_TARGET,
                        plugin = name,
                        error = %err,
                        "failed to load backend plugin"
                    );
                    return Err(PluginError::LoadFailed {
                        name: name.to_owned(),
                        source: Box::new(err),
                    });
                }
            }
        }
        debug!(
            target: REGISTRY_TARGET,
            plugins = providers.len(),
            "loaded backend plugins"
        );
        self.providers = providers;
        Ok(())
    }

    /// Looks up a loaded provider by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn BackendProvider> {
        self.providers.get(name).map(Box::as_ref)
    }

    /// Loaded plugin names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Asks every loaded provider for its backend matching `selection`.
    ///
    /// # Errors
    ///
    /// Returns the first provider error encountered, in name order.
    pub fn backends_for(
        &self,
        selection: Option<&str>,
    ) -> Result<BTreeMap<String, Box<dyn Backend>>, PluginError> {
        self.names()
            .into_iter()
            .filter_map(|name| self.providers.get(name).map(|provider| (name, provider)))
            .map(|(name, provider)| Ok((name.to_owned(), provider.get_backend(selection)?)))
            .collect()
    }

    /// Returns `true` once [`Self::load_all`] has been attempted.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Number of loaded providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns `true` when no provider is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .field("loaded", &self.loaded)
            .finish()
    }
}
