//! Unit tests for script-backed providers.
//!
//! Scripts are small POSIX shell programs written to a temporary directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

#[fixture]
fn workdir() -> TempDir {
    TempDir::new().expect("create temp dir")
}

fn load_error(loader: &dyn ScriptBackendLoader, path: &Path) -> PluginError {
    match loader.load(path) {
        Ok(_) => panic!("expected '{}' to be rejected", path.display()),
        Err(error) => error,
    }
}

#[cfg(unix)]
fn write_script(dir: &TempDir, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.path().join("backend.sh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut permissions = fs::metadata(&path).expect("script metadata").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).expect("make script executable");
    path
}

#[cfg(unix)]
fn provider(dir: &TempDir, body: &str) -> Box<dyn BackendProvider> {
    let path = write_script(dir, body);
    ProcessScriptLoader::new()
        .with_timeout(Duration::from_secs(10))
        .load(&path)
        .expect("script loads")
}

#[rstest]
fn missing_script_is_reported(workdir: TempDir) {
    let path = workdir.path().join("absent.sh");
    let error = load_error(&ProcessScriptLoader::new(), &path);
    assert!(matches!(error, PluginError::ScriptNotFound { path: ref missing } if *missing == path));
}

#[rstest]
fn directories_are_not_scripts(workdir: TempDir) {
    let error = load_error(&ProcessScriptLoader::new(), workdir.path());
    assert!(matches!(error, PluginError::ScriptNotFound { .. }));
}

#[rstest]
fn boxed_loaders_delegate(workdir: TempDir) {
    let loader: Box<dyn ScriptBackendLoader> = Box::new(ProcessScriptLoader::new());
    let error = load_error(&loader, &workdir.path().join("absent.sh"));
    assert!(matches!(error, PluginError::ScriptNotFound { .. }));
}

#[test]
fn loader_defaults_to_thirty_seconds() {
    assert_eq!(ProcessScriptLoader::new().timeout(), Duration::from_secs(30));
}

#[cfg(unix)]
#[rstest]
fn script_backend_is_returned_and_selection_forwarded(workdir: TempDir) {
    let capture = workdir.path().join("request.jsonl");
    let body = format!(
        "read line\nprintf '%s\\n' \"$line\" > '{}'\n\
         echo '{{\"success\":true,\"backend\":{{\"name\":\"scripted\",\"num_qubits\":3}}}}'",
        capture.display()
    );
    let backend = provider(&workdir, &body)
        .get_backend(Some("method=foo"))
        .expect("backend resolves");
    assert_eq!(backend.name(), "scripted");
    assert_eq!(backend.descriptor().num_qubits(), Some(3));

    let written = fs::read_to_string(&capture).expect("request captured");
    let request: ScriptRequest = serde_json::from_str(written.trim()).expect("request parses");
    assert_eq!(request.operation(), "get_backend");
    assert_eq!(request.selection(), Some("method=foo"));
}

#[cfg(unix)]
#[rstest]
fn invalid_selection_reason_maps_to_invalid_selection(workdir: TempDir) {
    let body = "read line\necho '{\"success\":false,\"reason_code\":\"invalid_selection\",\
                \"diagnostics\":[{\"severity\":\"error\",\"message\":\"unknown device\"}]}'";
    let error = provider(&workdir, body)
        .get_backend(Some("fake_nowhere"))
        .expect_err("selection rejected");
    match error {
        PluginError::InvalidSelection { selection, message } => {
            assert_eq!(selection, "fake_nowhere");
            assert_eq!(message, "unknown device");
        }
        other => panic!("expected InvalidSelection, got {other:?}"),
    }
}

#[cfg(unix)]
#[rstest]
fn other_failures_map_to_script_failed(workdir: TempDir) {
    let body = "read line\necho '{\"success\":false,\"reason_code\":\"internal_error\",\
                \"diagnostics\":[{\"severity\":\"error\",\"message\":\"boom\"}]}'";
    let error = provider(&workdir, body)
        .get_backend(None)
        .expect_err("script failed");
    assert!(matches!(error, PluginError::ScriptFailed { ref message, .. } if message == "boom"));
}

#[cfg(unix)]
#[rstest]
#[case::non_zero_exit("read line\nexit 3", "non_zero_exit")]
#[case::malformed("read line\necho 'not json'", "deserialize")]
#[case::silent("read line", "invalid_output")]
#[case::no_backend("read line\necho '{\"success\":true}'", "invalid_output")]
fn protocol_violations_are_typed(workdir: TempDir, #[case] body: &str, #[case] kind: &str) {
    let error = provider(&workdir, body)
        .get_backend(None)
        .expect_err("protocol violation");
    let matched = match kind {
        "non_zero_exit" => matches!(error, PluginError::NonZeroExit { status: 3, .. }),
        "deserialize" => matches!(error, PluginError::DeserializeResponse { .. }),
        "invalid_output" => matches!(error, PluginError::InvalidOutput { .. }),
        other => panic!("unsupported kind {other}"),
    };
    assert!(matched, "expected {kind}, got {error:?}");
}

#[cfg(unix)]
#[rstest]
fn slow_script_times_out(workdir: TempDir) {
    let path = write_script(&workdir, "read line\nsleep 5");
    let started = Instant::now();
    let error = ProcessScriptLoader::new()
        .with_timeout(Duration::from_millis(300))
        .load(&path)
        .expect("script loads")
        .get_backend(None)
        .expect_err("script is too slow");
    assert!(matches!(error, PluginError::Timeout { .. }), "got {error:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[cfg(unix)]
#[rstest]
fn heavy_stderr_output_does_not_stall_the_script(workdir: TempDir) {
    let body = "read line\n\
                echo '{\"success\":true,\"backend\":{\"name\":\"noisy\"}}'\n\
                head -c 200000 /dev/zero | tr '\\0' x >&2\n\
                exit 0";
    let path = write_script(&workdir, body);
    let backend = ProcessScriptLoader::new()
        .with_timeout(Duration::from_secs(2))
        .load(&path)
        .expect("script loads")
        .get_backend(None)
        .expect("stderr is drained while the script runs");
    assert_eq!(backend.name(), "noisy");
}

#[test]
fn successful_response_without_backend_is_invalid() {
    let response: ScriptResponse =
        serde_json::from_str(r#"{"success":true}"#).expect("deserialise");
    let error = into_backend("script", None, &response).expect_err("no backend");
    assert!(matches!(error, PluginError::InvalidOutput { .. }));
}
