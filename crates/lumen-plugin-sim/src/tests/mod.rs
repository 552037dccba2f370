//! Unit and behavioural tests for the simulator plugin.


use std::io::Cursor;

use lumen_plugins::protocol::{ReasonCode, ScriptRequest, ScriptResponse};
use lumen_plugins::{BackendProvider, EntryPoints, PluginError, PluginRegistry};
use rstest::rstest;
use strum::IntoEnumIterator;

use crate::{
    FAKE_DEVICES, FakeDevice, PLUGIN_NAME, SimulationMethod, SimulatorKind, SimulatorProvider,
    register, run, run_with_provider,
};

// ---------------------------------------------------------------------------
// Selection parsing
// ---------------------------------------------------------------------------

#[rstest]
#[case::absent(None)]
#[case::empty(Some(""))]
fn missing_selection_yields_automatic_simulator(#[case] selection: Option<&str>) {
    let backend = SimulatorProvider::new()
        .get_backend(selection)
        .expect("default backend");
    assert_eq!(backend.name(), "lumen_simulator");
    let descriptor = backend.descriptor();
    assert!(descriptor.is_simulator());
    assert!(!descriptor.is_noisy());
    assert_eq!(descriptor.option("method"), Some("automatic"));
}

#[test]
fn every_method_is_selectable() {
    for method in SimulationMethod::iter() {
        let selection = format!("method={method}");
        let kind = SimulatorKind::parse(Some(selection.as_str())).expect("method parses");
        assert_eq!(kind, SimulatorKind::Ideal(method));
    }
}

#[test]
fn method_selection_names_the_backend() {
    let backend = SimulatorProvider::new()
        .get_backend(Some("method=matrix_product_state"))
        .expect("backend");
    assert_eq!(backend.name(), "lumen_simulator_matrix_product_state");
    assert_eq!(
        backend.descriptor().option("method"),
        Some("matrix_product_state")
    );
}

#[rstest]
#[case("fake_quito", 5)]
#[case("fake_jakarta", 7)]
#[case("fake_brooklyn", 65)]
#[case("fake_washington", 127)]
fn fake_devices_carry_their_shape(#[case] name: &str, #[case] qubits: u32) {
    let descriptor = SimulatorProvider::new()
        .get_backend(Some(name))
        .expect("device backend")
        .descriptor();
    assert_eq!(descriptor.name(), name);
    assert_eq!(descriptor.num_qubits(), Some(qubits));
    assert!(descriptor.is_noisy());
}

#[rstest]
#[case::unknown_method("method=quantum_magic")]
#[case::empty_method("method=")]
#[case::unknown_device("fake_atlantis")]
#[case::wrong_case("FAKE_QUITO")]
fn unrecognised_selections_are_rejected(#[case] selection: &str) {
    let error = SimulatorProvider::new()
        .get_backend(Some(selection))
        .expect_err("selection is invalid");
    match error {
        PluginError::InvalidSelection {
            selection: reported,
            ..
        } => assert_eq!(reported, selection),
        other => panic!("expected invalid selection, got {other:?}"),
    }
}

#[test]
fn device_table_names_are_unique() {
    for device in FAKE_DEVICES {
        assert_eq!(FakeDevice::lookup(device.name()), Some(*device));
    }
    assert_eq!(FAKE_DEVICES.len(), 6);
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[test]
fn registration_exposes_the_default_plugin() {
    let mut entry_points = EntryPoints::new();
    register(&mut entry_points).expect("register");
    let mut registry = PluginRegistry::new();
    registry.load_all(&entry_points).expect("load");
    let provider = registry.get(PLUGIN_NAME).expect("default plugin present");
    let backend = provider.get_backend(Some("fake_lima")).expect("backend");
    assert_eq!(backend.name(), "fake_lima");
}

#[test]
fn registering_twice_is_rejected() {
    let mut entry_points = EntryPoints::new();
    register(&mut entry_points).expect("first registration");
    let error = register(&mut entry_points).expect_err("second registration");
    assert!(matches!(error, PluginError::DuplicateRegistration { .. }));
}

// ---------------------------------------------------------------------------
// Script protocol dispatch
// ---------------------------------------------------------------------------

fn dispatch(input: &str) -> ScriptResponse {
    let mut stdin = Cursor::new(input.as_bytes().to_vec());
    let mut stdout = Vec::new();
    run(&mut stdin, &mut stdout).expect("dispatch should succeed");
    let output = String::from_utf8(stdout).expect("utf8 stdout");
    serde_json::from_str(output.trim()).expect("parse response")
}

fn request_line(request: &ScriptRequest) -> String {
    format!(
        "{}\n",
        serde_json::to_string(request).expect("serialize request")
    )
}

#[test]
fn dispatch_answers_with_a_descriptor() {
    let response = dispatch(&request_line(&ScriptRequest::get_backend(Some(
        "method=stabilizer",
    ))));
    assert!(response.is_success());
    let descriptor = response.backend().expect("descriptor present");
    assert_eq!(descriptor.name(), "lumen_simulator_stabilizer");
}

#[rstest]
#[case::invalid_selection(
    request_line(&ScriptRequest::get_backend(Some("fake_atlantis"))),
    ReasonCode::InvalidSelection
)]
#[case::unsupported(
    request_line(&ScriptRequest::new("list_backends", None)),
    ReasonCode::UnsupportedOperation
)]
#[case::malformed(String::from("not json\n"), ReasonCode::MalformedRequest)]
#[case::empty(String::new(), ReasonCode::MalformedRequest)]
fn dispatch_reports_failures(#[case] input: String, #[case] reason: ReasonCode) {
    let response = dispatch(&input);
    assert!(!response.is_success());
    assert_eq!(response.reason_code(), Some(reason));
    assert!(!response.diagnostics().is_empty());
}

#[derive(Debug)]
struct Broken;

impl BackendProvider for Broken {
    fn get_backend(
        &self,
        _selection: Option<&str>,
    ) -> Result<Box<dyn lumen_plugins::Backend>, PluginError> {
        Err(PluginError::ScriptFailed {
            name: String::from("broken"),
            message: String::from("device offline"),
        })
    }
}

#[test]
fn provider_failures_become_internal_errors() {
    let mut stdin = Cursor::new(request_line(&ScriptRequest::get_backend(None)).into_bytes());
    let mut stdout = Vec::new();
    run_with_provider(&mut stdin, &mut stdout, &Broken).expect("dispatch");
    let response: ScriptResponse =
        serde_json::from_str(String::from_utf8(stdout).expect("utf8").trim()).expect("parse");
    assert_eq!(response.reason_code(), Some(ReasonCode::InternalError));
    assert!(response.diagnostic_summary().contains("device offline"));
}
