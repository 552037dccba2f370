//! Backend scripts: executables that answer one JSONL request.
//!
//! [`ProcessScriptLoader`] implements [`ScriptBackendLoader`] by checking the
//! script exists and handing back a [`ScriptProvider`]. Each
//! [`BackendProvider::get_backend`] call on that provider spawns the script,
//! writes a [`ScriptRequest`] line to stdin, reads a [`ScriptResponse`] line
//! from stdout, and waits for exit within the configured timeout.

use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::PluginError;
use crate::protocol::{ReasonCode, ScriptRequest, ScriptResponse};
use crate::provider::{Backend, BackendProvider, DescribedBackend};

/// Tracing target for backend script execution.
const SCRIPT_TARGET: &str = "lumen_plugins::script";

/// Timeout applied when none is configured.
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Loads a backend script at a filesystem path as a provider.
///
/// This is the seam [`BackendResolver`](crate::BackendResolver) uses for the
/// script override; tests substitute their own implementation.
pub trait ScriptBackendLoader {
    /// Loads the script at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ScriptNotFound`] if the path does not name a
    /// file, or any error raised while preparing the provider.
    fn load(&self, path: &Path) -> Result<Box<dyn BackendProvider>, PluginError>;
}

/// Loads scripts as child processes speaking the JSONL protocol.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use std::time::Duration;
///
/// use lumen_plugins::{ProcessScriptLoader, ScriptBackendLoader};
///
/// let loader = ProcessScriptLoader::new().with_timeout(Duration::from_secs(5));
/// let provider = loader.load(Path::new("./backend.sh")).expect("script exists");
/// let backend = provider.get_backend(Some("method=statevector"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessScriptLoader {
    timeout: Duration,
}

impl Default for ProcessScriptLoader {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SCRIPT_TIMEOUT,
        }
    }
}

impl ProcessScriptLoader {
    /// Creates a loader with the default timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl ScriptBackendLoader for ProcessScriptLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn BackendProvider>, PluginError> {
        if !path.is_file() {
            return Err(PluginError::ScriptNotFound {
                path: path.to_path_buf(),
            });
        }
        debug!(
            target: SCRIPT_TARGET,
            script = %path.display(),
            "loaded backend script"
        );
        Ok(Box::new(ScriptProvider::new(path, self.timeout)))
    }
}

impl<L: ScriptBackendLoader + ?Sized> ScriptBackendLoader for Box<L> {
    fn load(&self, path: &Path) -> Result<Box<dyn BackendProvider>, PluginError> {
        (**self).load(path)
    }
}

/// Provider backed by a script executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptProvider {
    path: PathBuf,
    timeout: Duration,
}

impl ScriptProvider {
    /// Creates a provider for the executable at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    /// Path of the executable.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn name(&self) -> String {
        self.path.display().to_string()
    }
}

impl BackendProvider for ScriptProvider {
    fn get_backend(&self, selection: Option<&str>) -> Result<Box<dyn Backend>, PluginError> {
        let name = self.name();
        let request = ScriptRequest::get_backend(selection);
        let response = execute_script(&name, &self.path, &request, self.timeout)?;
        into_backend(&name, selection, &response)
    }
}

/// Maps a parsed response onto a backend or a typed error.
fn into_backend(
    name: &str,
    selection: Option<&str>,
    response: &ScriptResponse,
) -> Result<Box<dyn Backend>, PluginError> {
    if response.is_success() {
        return response
            .backend()
            .map(|descriptor| Box::new(DescribedBackend::new(descriptor.clone())) as Box<dyn Backend>)
            .ok_or_else(|| PluginError::InvalidOutput {
                name: name.to_owned(),
                message: String::from("successful response carried no backend"),
            });
    }
    match response.reason_code() {
        Some(ReasonCode::InvalidSelection) => Err(PluginError::invalid_selection(
            selection.unwrap_or_default(),
            response.diagnostic_summary(),
        )),
        _ => Err(PluginError::ScriptFailed {
            name: name.to_owned(),
            message: response.diagnostic_summary(),
        }),
    }
}

/// Spawns the script, writes the request, reads and parses the response.
fn execute_script(
    name: &str,
    path: &Path,
    request: &ScriptRequest,
    timeout: Duration,
) -> Result<ScriptResponse, PluginError> {
    debug!(
        target: SCRIPT_TARGET,
        script = name,
        selection = request.selection().unwrap_or_default(),
        "spawning backend script"
    );

    let mut child = Command::new(path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| PluginError::SpawnFailed {
            name: name.to_owned(),
            message: err.to_string(),
            source: Some(Arc::new(err)),
        })?;

    let stdin = child.stdin.take().ok_or_else(|| PluginError::SpawnFailed {
        name: name.to_owned(),
        message: String::from("failed to capture stdin"),
        source: None,
    })?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| PluginError::SpawnFailed {
            name: name.to_owned(),
            message: String::from("failed to capture stdout"),
            source: None,
        })?;
    let stderr = child.stderr.take().map(drain_stderr);

    let deadline = Instant::now() + timeout;
    if let Err(err) = write_request(name, stdin, request) {
        kill(&mut child);
        return Err(err);
    }
    let line = match read_response(name, stdout, deadline, timeout) {
        Ok(line) => line,
        Err(err) => {
            kill(&mut child);
            return Err(err);
        }
    };
    wait_for_exit(name, &mut child, deadline, timeout)?;
    if let Some(drain) = stderr {
        log_stderr(name, drain);
    }
    if line.trim().is_empty() {
        return Err(PluginError::InvalidOutput {
            name: name.to_owned(),
            message: String::from("script produced no output on stdout"),
        });
    }
    parse_response(name, &line)
}

/// Writes the serialised request to the script's stdin and closes it.
fn write_request(
    name: &str,
    mut stdin: impl Write,
    request: &ScriptRequest,
) -> Result<(), PluginError> {
    let mut line = serde_json::to_string(request).map_err(PluginError::SerializeRequest)?;
    line.push('\n');
    match stdin.write_all(line.as_bytes()).and_then(|()| stdin.flush()) {
        Ok(()) => Ok(()),
        // The script may answer without reading its input.
        Err(err) if err.kind() == ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(PluginError::Io {
            name: name.to_owned(),
            source: Arc::new(err),
        }),
    }
}

/// Reads one line from stdout on a helper thread so the deadline holds even
/// when the script never writes.
fn read_response(
    name: &str,
    stdout: impl Read + Send + 'static,
    deadline: Instant,
    timeout: Duration,
) -> Result<String, PluginError> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut line = String::new();
        let outcome = BufReader::new(stdout).read_line(&mut line).map(|_| line);
        drop(sender.send(outcome));
    });
    let remaining = deadline.saturating_duration_since(Instant::now());
    match receiver.recv_timeout(remaining) {
        Ok(Ok(line)) => Ok(line),
        Ok(Err(err)) => Err(PluginError::Io {
            name: name.to_owned(),
            source: Arc::new(err),
        }),
        Err(_) => Err(timeout_error(name, deadline, timeout)),
    }
}

/// Collects stderr on a helper thread so a chatty script never blocks on a
/// full pipe while the deadline runs.
fn drain_stderr(reader: impl Read + Send + 'static) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = String::new();
        drop(BufReader::new(reader).read_to_string(&mut buffer));
        buffer
    })
}

/// Sends collected stderr to the debug log.
fn log_stderr(name: &str, drain: JoinHandle<String>) {
    let Ok(buffer) = drain.join() else {
        return;
    };
    if !buffer.is_empty() {
        debug!(
            target: SCRIPT_TARGET,
            script = name,
            stderr = %buffer.trim(),
            "backend script stderr output"
        );
    }
}

/// Waits for the child process to exit, enforcing the deadline.
fn wait_for_exit(
    name: &str,
    child: &mut Child,
    deadline: Instant,
    timeout: Duration,
) -> Result<(), PluginError> {
    let poll_interval = Duration::from_millis(20);
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(
                    target: SCRIPT_TARGET,
                    script = name,
                    ?status,
                    "backend script exited"
                );
                if status.success() {
                    return Ok(());
                }
                return Err(PluginError::NonZeroExit {
                    name: name.to_owned(),
                    status: status.code().unwrap_or(-1),
                });
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    kill(child);
                    return Err(timeout_error(name, deadline, timeout));
                }
                thread::sleep(poll_interval);
            }
            Err(err) => {
                return Err(PluginError::Io {
                    name: name.to_owned(),
                    source: Arc::new(err),
                });
            }
        }
    }
}

fn kill(child: &mut Child) {
    drop(child.kill());
    drop(child.wait());
}

fn timeout_error(name: &str, deadline: Instant, timeout: Duration) -> PluginError {
    warn!(
        target: SCRIPT_TARGET,
        script = name,
        overdue_ms = u64::try_from(Instant::now().saturating_duration_since(deadline).as_millis())
            .unwrap_or(u64::MAX),
        "backend script timed out, killing process"
    );
    PluginError::Timeout {
        name: name.to_owned(),
        timeout_secs: timeout.as_secs(),
    }
}

/// Parses a JSONL response line into a [`ScriptResponse`].
fn parse_response(name: &str, line: &str) -> Result<ScriptResponse, PluginError> {
    serde_json::from_str(line.trim()).map_err(|err| PluginError::DeserializeResponse {
        message: format!("backend script '{name}' produced invalid JSON: {err}"),
        source: Some(err),
    })
}

#[cfg(test)]
mod tests;
