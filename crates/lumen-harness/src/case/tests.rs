//! Unit tests for the base test case and suite bookkeeping.

use std::path::Path;

use lumen_config::{ConfigError, StaticConfig};
use lumen_lifecycle::Instance;
use lumen_plugin_sim::SimulatorProvider;
use lumen_plugins::{BackendProvider, PluginError};
use mockall::mock;
use rstest::{fixture, rstest};

use super::*;

mock! {
    Source {}
    impl ConfigSource for Source {
        fn load(&self) -> Result<Option<HarnessConfig>, ConfigError>;
    }
}

mock! {
    Loader {}
    impl ScriptBackendLoader for Loader {
        fn load(&self, path: &Path) -> Result<Box<dyn BackendProvider>, PluginError>;
    }
}

#[fixture]
fn entry_points() -> EntryPoints {
    let mut entry_points = EntryPoints::new();
    lumen_plugin_sim::register(&mut entry_points).expect("register simulator");
    entry_points
}

fn configured(config: HarnessConfig, entry_points: EntryPoints) -> TestSuite {
    TestSuite::new(Environment::new(StaticConfig::new(config), entry_points))
        .expect("base case defines")
}

fn set_up(suite: &TestSuite, class: ClassId) -> (Result<(), LifecycleError>, Instance<CaseState>) {
    let mut instance = suite
        .hierarchy()
        .construct(class, CaseState::new("test_example"))
        .expect("construct");
    let result = suite
        .hierarchy()
        .invoke(&mut instance, Lifecycle::SetUp.method_name(), &[]);
    (result, instance)
}

fn harness_cause(error: &LifecycleError) -> &HarnessError {
    error
        .failure_source::<HarnessError>()
        .expect("failure carries a harness error")
}

#[rstest]
fn set_up_without_configuration_uses_default_plugin(entry_points: EntryPoints) {
    let suite = TestSuite::new(Environment::new(StaticConfig::empty(), entry_points))
        .expect("base case defines");
    let (result, instance) = set_up(&suite, suite.base());
    result.expect("set_up succeeds");
    let state = instance.state();
    assert!(state.set_up_called());
    assert!(state.config().is_none());
    assert_eq!(state.backend().map(|backend| backend.name()), Some("lumen_simulator"));
    assert_eq!(state.timeout(), None);
}

#[rstest]
fn set_up_applies_configured_selection_and_timeout(entry_points: EntryPoints) {
    let config = HarnessConfig::default()
        .with_backend_selection("fake_manila")
        .with_test_timeout(12.5);
    let suite = configured(config, entry_points);
    let (result, instance) = set_up(&suite, suite.base());
    result.expect("set_up succeeds");
    let backend = instance.state().backend().expect("backend resolved");
    assert_eq!(backend.name(), "fake_manila");
    assert_eq!(backend.descriptor().num_qubits(), Some(5));
    assert_eq!(instance.state().timeout(), Some(Duration::from_millis(12_500)));
}

#[rstest]
#[case::override_wins(Some("30"), Some(Duration::from_secs(30)))]
#[case::non_positive_falls_back(Some("0"), Some(Duration::from_secs(4)))]
#[case::garbage_falls_back(Some("soon"), Some(Duration::from_secs(4)))]
#[case::absent_uses_config(None, Some(Duration::from_secs(4)))]
fn timeout_override_is_resolved(
    entry_points: EntryPoints,
    #[case] raw: Option<&str>,
    #[case] expected: Option<Duration>,
) {
    let mut environment = Environment::new(
        StaticConfig::new(HarnessConfig::default().with_test_timeout(4.0)),
        entry_points,
    );
    if let Some(value) = raw {
        environment = environment.with_timeout_override(value);
    }
    let suite = TestSuite::new(environment).expect("base case defines");
    let (result, instance) = set_up(&suite, suite.base());
    result.expect("set_up succeeds");
    assert_eq!(instance.state().timeout(), expected);
}

#[rstest]
fn configured_script_is_loaded_instead_of_plugin(entry_points: EntryPoints) {
    let mut loader = MockLoader::new();
    loader
        .expect_load()
        .withf(|path| path == Path::new("/opt/lumen/backend"))
        .times(1)
        .returning(|_| Ok(Box::new(SimulatorProvider::new())));
    let config = HarnessConfig::default()
        .with_backend_plugin("missing")
        .with_backend_script("/opt/lumen/backend")
        .with_backend_selection("method=stabilizer");
    let environment =
        Environment::new(StaticConfig::new(config), entry_points).with_script_loader(loader);
    let suite = TestSuite::new(environment).expect("base case defines");
    let (result, instance) = set_up(&suite, suite.base());
    result.expect("set_up succeeds");
    assert_eq!(
        instance.state().backend().map(|backend| backend.name()),
        Some("lumen_simulator_stabilizer")
    );
}

#[rstest]
fn unknown_plugin_fails_set_up(entry_points: EntryPoints) {
    let suite = configured(
        HarnessConfig::default().with_backend_plugin("missing"),
        entry_points,
    );
    let (result, instance) = set_up(&suite, suite.base());
    let error = result.expect_err("no plugin named missing");
    assert!(matches!(
        harness_cause(&error),
        HarnessError::Plugin(PluginError::UnknownPlugin { .. })
    ));
    assert!(instance.state().backend().is_none());
}

#[rstest]
fn configuration_errors_fail_set_up(entry_points: EntryPoints) {
    let mut source = MockSource::new();
    source
        .expect_load()
        .times(1)
        .returning(|| Err(ConfigError::EmptyDocument));
    let suite = TestSuite::new(Environment::new(source, entry_points)).expect("base case defines");
    let (result, _) = set_up(&suite, suite.base());
    let error = result.expect_err("configuration is empty");
    assert!(matches!(
        harness_cause(&error),
        HarnessError::Config(ConfigError::EmptyDocument)
    ));
}

#[rstest]
fn repeated_set_up_is_rejected(entry_points: EntryPoints) {
    let suite = configured(HarnessConfig::default(), entry_points);
    let (result, mut instance) = set_up(&suite, suite.base());
    result.expect("first set_up succeeds");
    let error = suite
        .hierarchy()
        .invoke(&mut instance, Lifecycle::SetUp.method_name(), &[])
        .expect_err("second set_up fails");
    assert!(matches!(
        harness_cause(&error),
        HarnessError::SetUpRepeated { class } if class == BASE_CASE
    ));
}

#[rstest]
fn repeated_tear_down_is_rejected(entry_points: EntryPoints) {
    let suite = configured(HarnessConfig::default(), entry_points);
    let (_, mut instance) = set_up(&suite, suite.base());
    let tear_down = Lifecycle::TearDown.method_name();
    suite
        .hierarchy()
        .invoke(&mut instance, tear_down.clone(), &[])
        .expect("first tear_down succeeds");
    assert!(instance.state().tear_down_called());
    let error = suite
        .hierarchy()
        .invoke(&mut instance, tear_down, &[])
        .expect_err("second tear_down fails");
    assert!(matches!(
        harness_cause(&error),
        HarnessError::TearDownRepeated { .. }
    ));
}

#[rstest]
fn overrides_must_chain_to_base(entry_points: EntryPoints) {
    let mut suite = configured(HarnessConfig::default(), entry_points);
    let chained = suite
        .define_case(CaseSpec::new("Chained").method("set_up", |call| {
            call.super_call()?;
            call.state()?.note("chained");
            Ok(())
        }))
        .expect("define chained");
    let forgetful = suite
        .define_case(CaseSpec::new("Forgetful").method("set_up", |call| {
            call.state()?.note("forgot");
            Ok(())
        }))
        .expect("define forgetful");

    let (result, instance) = set_up(&suite, chained);
    result.expect("chained set_up succeeds");
    assert_eq!(instance.state().notes(), ["chained"]);
    assert!(instance.state().backend().is_some());

    let (skipped, unprepared) = set_up(&suite, forgetful);
    let error = skipped.expect_err("forgetful set_up skipped the base");
    assert!(matches!(
        error,
        LifecycleError::Enforcement { ref class, ref method } if class == "Forgetful" && method == "set_up"
    ));
    assert!(!unprepared.state().set_up_called());
}

#[rstest]
fn class_steps_are_enforced(entry_points: EntryPoints) {
    let mut suite = configured(HarnessConfig::default(), entry_points);
    let lazy = suite
        .define_case(CaseSpec::new("Lazy").class_method("tear_down_class", |_call| Ok(())))
        .expect("define lazy");
    suite
        .hierarchy()
        .invoke_class(lazy, Lifecycle::SetUpClass.method_name(), &[])
        .expect("inherited set_up_class runs");
    let error = suite
        .hierarchy()
        .invoke_class(lazy, Lifecycle::TearDownClass.method_name(), &[])
        .expect_err("override skipped the base");
    assert!(matches!(error, LifecycleError::Enforcement { .. }));
}

#[rstest]
fn test_names_include_inherited_tests(entry_points: EntryPoints) {
    let mut suite = configured(HarnessConfig::default(), entry_points);
    let parent = suite
        .define_case(
            CaseSpec::new("Parent")
                .method("test_shared", |_call| Ok(()))
                .method("helper", |_call| Ok(())),
        )
        .expect("define parent");
    let child = suite
        .define_case_under(
            parent,
            CaseSpec::new("Child")
                .method("test_own", |_call| Ok(()))
                .method("test_shared", |_call| Ok(())),
        )
        .expect("define child");
    assert_eq!(suite.test_names(child), vec!["test_own", "test_shared"]);
    assert_eq!(suite.test_names(parent), vec!["test_shared"]);
    assert!(suite.test_names(suite.base()).is_empty());
    assert_eq!(suite.class_id("Child"), Some(child));
}

#[rstest]
fn tags_are_inherited_and_merged(entry_points: EntryPoints) {
    let mut suite = configured(HarnessConfig::default(), entry_points);
    let parent = suite
        .define_case(CaseSpec::new("Parent").method("test_run", |_call| Ok(())))
        .expect("define parent");
    let child = suite
        .define_case_under(parent, CaseSpec::new("Child"))
        .expect("define child");
    suite.tag_class(parent, ComponentTags::new(["terra"]));
    suite.tag_test(parent, "test_run", ComponentTags::new(["backend"]));
    suite.tag_test(child, "test_run", ComponentTags::new(["nature"]).when(false));

    let tags = suite.tags_for(child, "test_run");
    assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["backend", "terra"]);
    assert!(suite.tags_for(child, "test_other").contains("terra"));
    assert!(suite.tags_for(suite.base(), "test_run").is_empty());
}

#[test]
fn request_follows_configuration() {
    let request = Environment::request_for(None);
    assert_eq!(request.plugin_name(), "default");
    assert_eq!(request.selection(), None);
    assert_eq!(request.script_path(), None);

    let config = HarnessConfig::default()
        .with_backend_plugin("remote")
        .with_backend_selection("fake_lima")
        .with_backend_script("/opt/backend");
    let request = Environment::request_for(Some(&config));
    assert_eq!(request.plugin_name(), "remote");
    assert_eq!(request.selection(), Some("fake_lima"));
    assert_eq!(request.script_path(), Some(Path::new("/opt/backend")));
}
