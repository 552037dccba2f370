//! Backend plugin discovery and resolution for the lumen test harness.
//!
//! The `lumen-plugins` crate resolves exactly one compute backend per test
//! run. Providers of the backend capability register a factory by name in an
//! [`EntryPoints`] table; a [`PluginRegistry`] instantiates every factory
//! eagerly and fails as a whole if any one of them fails.
//!
//! # Architecture
//!
//! [`BackendResolver`] applies a fixed precedence. An explicit script path
//! wins and is loaded through a [`ScriptBackendLoader`]; the production
//! [`ProcessScriptLoader`] runs the script as a child process speaking a
//! single-line JSONL protocol over standard I/O (see [`protocol`]).
//! Otherwise the named plugin, `"default"` unless configured, is looked up
//! in a freshly loaded registry. The selection string reaches the provider
//! unchanged in both cases.
//!
//! # Example
//!
//! ```rust,no_run
//! use lumen_plugins::{BackendResolver, ProcessScriptLoader, ResolveRequest, global_entry_points};
//!
//! let resolver = BackendResolver::new(global_entry_points(), ProcessScriptLoader::new());
//! let request = ResolveRequest::new().with_selection("method=statevector");
//! let backend = resolver.resolve(&request).expect("backend resolves");
//! assert!(!backend.name().is_empty());
//! ```

pub mod entry_points;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod script;

#[cfg(test)]
mod tests;

pub use self::entry_points::{
    EntryPoints, FactoryResult, ProviderFactory, global_entry_points, register_global,
};
pub use self::error::PluginError;
pub use self::protocol::{
    DiagnosticSeverity, ReasonCode, ScriptDiagnostic, ScriptRequest, ScriptResponse,
};
pub use self::provider::{Backend, BackendDescriptor, BackendProvider, DescribedBackend};
pub use self::registry::PluginRegistry;
pub use self::resolver::{BackendResolver, DEFAULT_PLUGIN, ResolveRequest};
pub use self::script::{
    DEFAULT_SCRIPT_TIMEOUT, ProcessScriptLoader, ScriptBackendLoader, ScriptProvider,
};
