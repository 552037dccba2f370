//! The base test case class and the suite of classes derived from it.
//!
//! A [`TestSuite`] owns a lifecycle [`Hierarchy`] whose root is
//! [`BASE_CASE`]. The root's `set_up` loads configuration through the
//! suite's [`Environment`], initialises telemetry, resolves the backend and
//! records the test timeout; its `tear_down` only guards against repeated
//! calls. Every lifecycle step named by [`Lifecycle`] is governed by a
//! [`CallEnforcer`], so a derived case that overrides `set_up` without
//! calling [`Call::super_call`] fails with
//! [`LifecycleError::Enforcement`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use lumen_config::{
    ConfigSource, DiscoveredConfig, HarnessConfig, TEST_TIMEOUT_ENV, resolve_test_timeout,
};
use lumen_lifecycle::{Call, CallEnforcer, ClassId, ClassSpec, Hierarchy, LifecycleError};
use lumen_plugins::{
    Backend, BackendResolver, EntryPoints, ProcessScriptLoader, ResolveRequest,
    ScriptBackendLoader, global_entry_points,
};
use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::error::HarnessError;
use crate::lifecycle::Lifecycle;
use crate::tags::ComponentTags;
use crate::telemetry::{self, TelemetrySettings};

/// Name of the root test case class.
pub const BASE_CASE: &str = "BaseTestCase";

const CASE_TARGET: &str = "lumen_harness::case";

/// Declaration of a class derived from [`BASE_CASE`].
pub type CaseSpec = ClassSpec<CaseState>;

/// Context handed to test case methods.
pub type CaseCall<'h, 'r> = Call<'h, 'r, CaseState>;

/// Per-instance state of a test case.
#[derive(Debug)]
pub struct CaseState {
    test: String,
    set_up_called: bool,
    tear_down_called: bool,
    config: Option<HarnessConfig>,
    backend: Option<Box<dyn Backend>>,
    timeout: Option<Duration>,
    notes: Vec<String>,
}

impl CaseState {
    /// Fresh state for one run of `test`.
    #[must_use]
    pub fn new(test: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            set_up_called: false,
            tear_down_called: false,
            config: None,
            backend: None,
            timeout: None,
            notes: Vec::new(),
        }
    }

    /// Name of the test method this instance runs.
    #[must_use]
    pub fn test(&self) -> &str {
        &self.test
    }

    /// Returns `true` once the base `set_up` ran.
    #[must_use]
    pub const fn set_up_called(&self) -> bool {
        self.set_up_called
    }

    /// Returns `true` once the base `tear_down` ran.
    #[must_use]
    pub const fn tear_down_called(&self) -> bool {
        self.tear_down_called
    }

    /// Configuration loaded during `set_up`, if a file was found.
    #[must_use]
    pub const fn config(&self) -> Option<&HarnessConfig> {
        self.config.as_ref()
    }

    /// Backend resolved during `set_up`.
    #[must_use]
    pub fn backend(&self) -> Option<&dyn Backend> {
        self.backend.as_deref()
    }

    /// Timeout the surrounding runner should enforce, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Records a free-form note, typically from a test body.
    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Notes recorded so far, oldest first.
    #[must_use]
    pub fn notes(&self) -> &[String] {
        &self.notes
    }
}

/// Everything the base `set_up` reaches outside the hierarchy.
pub struct Environment {
    config_source: Box<dyn ConfigSource>,
    resolver: BackendResolver<Box<dyn ScriptBackendLoader>>,
    timeout_override: Option<String>,
    telemetry: bool,
}

impl Environment {
    /// Creates an environment reading configuration from `config_source`
    /// and resolving plugins from `entry_points`.
    ///
    /// Scripts are run with [`ProcessScriptLoader`]; telemetry is left
    /// uninitialised and no timeout override applies.
    #[must_use]
    pub fn new(config_source: impl ConfigSource + 'static, entry_points: EntryPoints) -> Self {
        Self {
            config_source: Box::new(config_source),
            resolver: BackendResolver::new(entry_points, Box::new(ProcessScriptLoader::new())),
            timeout_override: None,
            telemetry: false,
        }
    }

    /// Environment of a real test run.
    ///
    /// Registers the built-in simulator globally, discovers configuration
    /// on the filesystem, reads the timeout override from
    /// [`TEST_TIMEOUT_ENV`] and initialises telemetry during `set_up`.
    #[must_use]
    pub fn from_env() -> Self {
        if let Err(error) = lumen_plugin_sim::register_global() {
            debug!(
                target: CASE_TARGET,
                error = %error,
                "built-in simulator already registered"
            );
        }
        let mut environment = Self::new(DiscoveredConfig::from_env(), global_entry_points());
        environment.timeout_override = std::env::var(TEST_TIMEOUT_ENV).ok();
        environment.telemetry = true;
        environment
    }

    /// Replaces the loader used for `backend_script` paths.
    #[must_use]
    pub fn with_script_loader(self, loader: impl ScriptBackendLoader + 'static) -> Self {
        let entry_points = self.resolver.entry_points().clone();
        Self {
            resolver: BackendResolver::new(entry_points, Box::new(loader)),
            ..self
        }
    }

    /// Uses `value` as the raw timeout override instead of the environment.
    #[must_use]
    pub fn with_timeout_override(mut self, value: impl Into<String>) -> Self {
        self.timeout_override = Some(value.into());
        self
    }

    /// Enables or disables telemetry initialisation during `set_up`.
    #[must_use]
    pub const fn with_telemetry(mut self, enabled: bool) -> Self {
        self.telemetry = enabled;
        self
    }

    /// Registered provider factories.
    #[must_use]
    pub const fn entry_points(&self) -> &EntryPoints {
        self.resolver.entry_points()
    }

    /// Backend request implied by `config`.
    ///
    /// Without a configuration the `"default"` plugin is asked for its
    /// backend with no selection.
    #[must_use]
    pub fn request_for(config: Option<&HarnessConfig>) -> ResolveRequest {
        let Some(settings) = config else {
            return ResolveRequest::new();
        };
        let mut request = ResolveRequest::new().with_plugin(settings.backend_plugin());
        if let Some(selection) = settings.backend_selection() {
            request = request.with_selection(selection);
        }
        if let Some(script) = settings.backend_script() {
            request = request.with_script(script.as_std_path());
        }
        request
    }

    /// Fills `state` with the configuration, backend and timeout of a run.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] if configuration cannot be loaded,
    /// [`HarnessError::Telemetry`] if logging cannot be configured, or
    /// [`HarnessError::Plugin`] if no backend resolves.
    pub fn prepare(&self, state: &mut CaseState) -> Result<(), HarnessError> {
        let config = self.config_source.load()?;
        if self.telemetry {
            let settings = TelemetrySettings::from_config(config.as_ref());
            let _handle = telemetry::initialise(&settings)?;
        }
        let backend = self.resolver.resolve(&Self::request_for(config.as_ref()))?;
        state.timeout = resolve_test_timeout(self.timeout_override.as_deref(), config.as_ref());
        state.backend = Some(backend);
        state.config = config;
        Ok(())
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("entry_points", self.resolver.entry_points())
            .field("timeout_override", &self.timeout_override)
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}

/// Test case classes rooted at [`BASE_CASE`], with their component tags.
pub struct TestSuite {
    hierarchy: Hierarchy<CaseState>,
    base: ClassId,
    class_tags: BTreeMap<ClassId, ComponentTags>,
    test_tags: BTreeMap<(ClassId, String), ComponentTags>,
}

impl TestSuite {
    /// Defines [`BASE_CASE`] over `environment` and governs its lifecycle.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Lifecycle`] if the base class cannot be
    /// defined or enforced.
    pub fn new(environment: Environment) -> Result<Self, HarnessError> {
        let mut hierarchy = Hierarchy::new();
        let base = hierarchy.define_root(
            CaseSpec::new(BASE_CASE)
                .method(Lifecycle::SetUp.method_name(), move |call| {
                    base_set_up(call, &environment)
                })
                .method(Lifecycle::TearDown.method_name(), base_tear_down)
                .class_method(Lifecycle::SetUpClass.method_name(), |call| {
                    log_class_step(call, Lifecycle::SetUpClass);
                    Ok(())
                })
                .class_method(Lifecycle::TearDownClass.method_name(), |call| {
                    log_class_step(call, Lifecycle::TearDownClass);
                    Ok(())
                }),
        )?;
        CallEnforcer::new(Lifecycle::iter().map(Lifecycle::method_name))
            .apply(&mut hierarchy, base)?;
        Ok(Self {
            hierarchy,
            base,
            class_tags: BTreeMap::new(),
            test_tags: BTreeMap::new(),
        })
    }

    /// The root class.
    #[must_use]
    pub const fn base(&self) -> ClassId {
        self.base
    }

    /// The underlying hierarchy, for direct dispatch.
    #[must_use]
    pub const fn hierarchy(&self) -> &Hierarchy<CaseState> {
        &self.hierarchy
    }

    /// Looks up a class by name.
    #[must_use]
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.hierarchy.class_id(name)
    }

    /// Defines a case class directly below [`BASE_CASE`].
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Lifecycle`] if the name is taken.
    pub fn define_case(&mut self, spec: CaseSpec) -> Result<ClassId, HarnessError> {
        self.define_case_under(self.base, spec)
    }

    /// Defines a case class below `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Lifecycle`] if the name is taken or `parent`
    /// belongs to another suite.
    pub fn define_case_under(
        &mut self,
        parent: ClassId,
        spec: CaseSpec,
    ) -> Result<ClassId, HarnessError> {
        Ok(self.hierarchy.define_subclass(parent, spec)?)
    }

    /// Attaches `tags` to every test of `class` and its descendants.
    pub fn tag_class(&mut self, class: ClassId, tags: ComponentTags) {
        let merged = self.class_tags.remove(&class).unwrap_or_default().merge(tags);
        self.class_tags.insert(class, merged);
    }

    /// Attaches `tags` to `test` as declared on `class`.
    pub fn tag_test(&mut self, class: ClassId, test: impl Into<String>, tags: ComponentTags) {
        let key = (class, test.into());
        let merged = self.test_tags.remove(&key).unwrap_or_default().merge(tags);
        self.test_tags.insert(key, merged);
    }

    /// Tags in effect for `test` run on `class`, inherited from ancestors.
    #[must_use]
    pub fn tags_for(&self, class: ClassId, test: &str) -> ComponentTags {
        self.hierarchy
            .ancestry(class)
            .fold(ComponentTags::default(), |tags, ancestor| {
                let on_class = self.class_tags.get(&ancestor).cloned().unwrap_or_default();
                let on_test = self
                    .test_tags
                    .get(&(ancestor, test.to_owned()))
                    .cloned()
                    .unwrap_or_default();
                tags.merge(on_class).merge(on_test)
            })
    }

    /// Test methods available on `class`, sorted.
    ///
    /// A test method is any method whose name starts with `test`, declared
    /// on the class or inherited.
    #[must_use]
    pub fn test_names(&self, class: ClassId) -> Vec<String> {
        self.hierarchy
            .ancestry(class)
            .flat_map(|ancestor| self.hierarchy.declared_methods(ancestor))
            .filter(|name| name.as_str().starts_with("test"))
            .map(|name| name.as_str().to_owned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl fmt::Debug for TestSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSuite")
            .field("hierarchy", &self.hierarchy)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

fn receiver_name(call: &CaseCall<'_, '_>) -> String {
    let class = call.receiver_class();
    call.hierarchy()
        .class_name(class)
        .map_or_else(|| class.to_string(), str::to_owned)
}

fn base_set_up(call: &mut CaseCall<'_, '_>, environment: &Environment) -> Result<(), LifecycleError> {
    let class = receiver_name(call);
    let state = call.state()?;
    if state.set_up_called {
        return Err(call.fail(HarnessError::SetUpRepeated { class }));
    }
    state.set_up_called = true;
    environment
        .prepare(state)
        .map_err(|error| call.fail(error))?;
    let prepared = call.state()?;
    info!(
        target: CASE_TARGET,
        class = %class,
        test = %prepared.test,
        backend = prepared.backend().map(|backend| backend.name()).unwrap_or_default(),
        timeout_secs = prepared.timeout.map(|timeout| timeout.as_secs()),
        "test case set up"
    );
    Ok(())
}

fn base_tear_down(call: &mut CaseCall<'_, '_>) -> Result<(), LifecycleError> {
    let class = receiver_name(call);
    let state = call.state()?;
    if state.tear_down_called {
        return Err(call.fail(HarnessError::TearDownRepeated { class }));
    }
    state.tear_down_called = true;
    debug!(target: CASE_TARGET, class = %class, test = %state.test, "test case torn down");
    Ok(())
}

fn log_class_step(call: &CaseCall<'_, '_>, step: Lifecycle) {
    debug!(
        target: CASE_TARGET,
        class = %receiver_name(call),
        step = step.as_str(),
        "class lifecycle step"
    );
}

#[cfg(test)]
mod tests;
