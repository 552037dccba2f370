//! Backend resolution with a fixed precedence.
//!
//! [`BackendResolver`] turns a [`ResolveRequest`] into exactly one backend:
//!
//! 1. a configured script path wins, and the plugin registry is not
//!    consulted at all;
//! 2. otherwise the named plugin (default `"default"`) is looked up in a
//!    freshly loaded [`PluginRegistry`].
//!
//! In both cases the selection string is handed to the provider unchanged.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::entry_points::EntryPoints;
use crate::error::PluginError;
use crate::provider::Backend;
use crate::registry::PluginRegistry;
use crate::script::ScriptBackendLoader;

/// Tracing target for resolution decisions.
const RESOLVER_TARGET: &str = "lumen_plugins::resolver";

/// Plugin name used when none is configured.
pub const DEFAULT_PLUGIN: &str = "default";

/// Inputs to [`BackendResolver::resolve`].
///
/// # Example
///
/// ```
/// use lumen_plugins::ResolveRequest;
///
/// let request = ResolveRequest::new().with_selection("method=statevector");
/// assert_eq!(request.plugin_name(), "default");
/// assert_eq!(request.selection(), Some("method=statevector"));
/// assert!(request.script_path().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    script_path: Option<PathBuf>,
    plugin_name: String,
    selection: Option<String>,
}

impl Default for ResolveRequest {
    fn default() -> Self {
        Self {
            script_path: None,
            plugin_name: DEFAULT_PLUGIN.to_owned(),
            selection: None,
        }
    }
}

impl ResolveRequest {
    /// Creates a request for the default plugin with no selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the script at `path` instead of the registry.
    #[must_use]
    pub fn with_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.script_path = Some(path.into());
        self
    }

    /// Names the plugin to look up.
    #[must_use]
    pub fn with_plugin(mut self, name: impl Into<String>) -> Self {
        self.plugin_name = name.into();
        self
    }

    /// Sets the selection string passed to the provider.
    #[must_use]
    pub fn with_selection(mut self, selection: impl Into<String>) -> Self {
        self.selection = Some(selection.into());
        self
    }

    /// Configured script path.
    #[must_use]
    pub fn script_path(&self) -> Option<&Path> {
        self.script_path.as_deref()
    }

    /// Plugin name to look up.
    #[must_use]
    pub const fn plugin_name(&self) -> &str {
        self.plugin_name.as_str()
    }

    /// Selection string.
    #[must_use]
    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }
}

/// Resolves one backend from a script override or the plugin registry.
///
/// # Example
///
/// ```
/// use std::path::Path;
///
/// use lumen_plugins::{
///     Backend, BackendDescriptor, BackendProvider, BackendResolver, DescribedBackend,
///     EntryPoints, PluginError, ResolveRequest, ScriptBackendLoader,
/// };
///
/// struct Fixed(&'static str);
/// impl BackendProvider for Fixed {
///     fn get_backend(&self, _selection: Option<&str>) -> Result<Box<dyn Backend>, PluginError> {
///         Ok(Box::new(DescribedBackend::new(BackendDescriptor::new(self.0))))
///     }
/// }
///
/// struct NoScripts;
/// impl ScriptBackendLoader for NoScripts {
///     fn load(&self, path: &Path) -> Result<Box<dyn BackendProvider>, PluginError> {
///         Err(PluginError::ScriptNotFound { path: path.to_path_buf() })
///     }
/// }
///
/// let mut entry_points = EntryPoints::new();
/// entry_points.register("default", || Ok(Box::new(Fixed("ideal")) as _)).expect("register");
///
/// let resolver = BackendResolver::new(entry_points, NoScripts);
/// let backend = resolver.resolve(&ResolveRequest::new()).expect("resolves");
/// assert_eq!(backend.name(), "ideal");
/// ```
#[derive(Debug)]
pub struct BackendResolver<L> {
    entry_points: EntryPoints,
    script_loader: L,
}

impl<L> BackendResolver<L> {
    /// Creates a resolver over `entry_points` with the given script loader.
    #[must_use]
    pub const fn new(entry_points: EntryPoints, script_loader: L) -> Self {
        Self {
            entry_points,
            script_loader,
        }
    }

    /// Registered provider factories.
    #[must_use]
    pub const fn entry_points(&self) -> &EntryPoints {
        &self.entry_points
    }
}

impl<L: ScriptBackendLoader> BackendResolver<L> {
    /// Resolves exactly one backend for `request`.
    ///
    /// # Errors
    ///
    /// Returns any script loading error, any registry load error,
    /// [`PluginError::UnknownPlugin`] when the named plugin is not
    /// registered, or the provider's own error for the selection.
    pub fn resolve(&self, request: &ResolveRequest) -> Result<Box<dyn Backend>, PluginError> {
        if let Some(path) = request.script_path() {
            info!(
                target: RESOLVER_TARGET,
                script = %path.display(),
                selection = request.selection().unwrap_or_default(),
                "resolving backend from script"
            );
            let provider = self.script_loader.load(path)?;
            return provider.get_backend(request.selection());
        }

        let mut registry = PluginRegistry::new();
        registry.load_all(&self.entry_points)?;
        let name = request.plugin_name();
        let provider = registry
            .get(name)
            .ok_or_else(|| PluginError::UnknownPlugin {
                name: name.to_owned(),
                available: registry.names().into_iter().map(str::to_owned).collect(),
            })?;
        info!(
            target: RESOLVER_TARGET,
            plugin = name,
            selection = request.selection().unwrap_or_default(),
            "resolving backend from plugin"
        );
        provider.get_backend(request.selection())
    }
}
