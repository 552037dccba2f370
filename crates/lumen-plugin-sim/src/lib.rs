//! Built-in simulator backend plugin for the lumen test harness.
//!
//! The crate registers a [`SimulatorProvider`] under the plugin name
//! [`PLUGIN_NAME`] and ships `lumen-sim-backend`, a binary that answers the
//! harness's script protocol so the same provider can be configured as a
//! `backend_script`.
//!
//! Selection strings understood by the provider:
//!
//! - absent or empty: the ideal simulator with the automatic method;
//! - `method=<name>`: the ideal simulator using one [`SimulationMethod`];
//! - a [`FakeDevice`] name such as `fake_quito`: a noisy device model.

mod catalog;

#[cfg(test)]
mod tests;

use std::io::{BufRead, Write};

use lumen_plugins::protocol::{
    GET_BACKEND_OPERATION, ReasonCode, ScriptDiagnostic, ScriptRequest, ScriptResponse,
};
use lumen_plugins::{Backend, BackendDescriptor, BackendProvider, EntryPoints, PluginError};
use thiserror::Error;
use tracing::debug;

pub use self::catalog::{FAKE_DEVICES, FakeDevice, SimulationMethod};

/// Registration name of the simulator plugin.
pub const PLUGIN_NAME: &str = "default";

/// Name of the ideal simulator backend.
pub const SIMULATOR_NAME: &str = "lumen_simulator";

const METHOD_PREFIX: &str = "method=";
const SIM_TARGET: &str = "lumen_plugin_sim";

/// What a selection string resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatorKind {
    /// Noiseless simulator using the given method.
    Ideal(SimulationMethod),
    /// Noisy model of a fake device.
    Device(FakeDevice),
}

impl SimulatorKind {
    /// Parses a selection string.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidSelection`] naming the full selection
    /// when it names no method or device.
    pub fn parse(selection: Option<&str>) -> Result<Self, PluginError> {
        let Some(text) = selection.filter(|value| !value.is_empty()) else {
            return Ok(Self::Ideal(SimulationMethod::default()));
        };
        if let Some(method) = text.strip_prefix(METHOD_PREFIX) {
            return method.parse::<SimulationMethod>().map(Self::Ideal).map_err(|_| {
                PluginError::invalid_selection(
                    text,
                    format!("unknown simulation method '{method}'"),
                )
            });
        }
        FakeDevice::lookup(text)
            .map(Self::Device)
            .ok_or_else(|| {
                PluginError::invalid_selection(
                    text,
                    "expected 'method=<name>' or a fake device name",
                )
            })
    }
}

/// A backend produced by the simulator plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorBackend {
    kind: SimulatorKind,
    name: String,
}

impl SimulatorBackend {
    /// Creates a backend of the given kind.
    #[must_use]
    pub fn new(kind: SimulatorKind) -> Self {
        let name = match kind {
            SimulatorKind::Ideal(SimulationMethod::Automatic) => SIMULATOR_NAME.to_owned(),
            SimulatorKind::Ideal(method) => format!("{SIMULATOR_NAME}_{method}"),
            SimulatorKind::Device(device) => device.name().to_owned(),
        };
        Self { kind, name }
    }

    /// What this backend simulates.
    #[must_use]
    pub const fn kind(&self) -> SimulatorKind {
        self.kind
    }
}

impl Backend for SimulatorBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> BackendDescriptor {
        let descriptor = BackendDescriptor::new(self.name.as_str()).simulator();
        match self.kind {
            SimulatorKind::Ideal(method) => descriptor.with_option("method", method.as_str()),
            SimulatorKind::Device(device) => descriptor
                .with_qubits(device.num_qubits())
                .noisy()
                .with_option("method", SimulationMethod::Automatic.as_str()),
        }
    }
}

/// Provider serving ideal simulators and fake devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatorProvider;

impl SimulatorProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl BackendProvider for SimulatorProvider {
    fn get_backend(&self, selection: Option<&str>) -> Result<Box<dyn Backend>, PluginError> {
        let kind = SimulatorKind::parse(selection)?;
        let backend = SimulatorBackend::new(kind);
        debug!(
            target: SIM_TARGET,
            selection = selection.unwrap_or_default(),
            backend = backend.name(),
            "simulator backend selected"
        );
        Ok(Box::new(backend))
    }
}

/// Registers the simulator under [`PLUGIN_NAME`].
///
/// # Errors
///
/// Returns [`PluginError::DuplicateRegistration`] if the name is taken.
pub fn register(entry_points: &mut EntryPoints) -> Result<(), PluginError> {
    entry_points.register(PLUGIN_NAME, provider_factory)
}

/// Registers the simulator in the process-wide entry point table.
///
/// # Errors
///
/// Returns [`PluginError::DuplicateRegistration`] if the name is taken.
pub fn register_global() -> Result<(), PluginError> {
    lumen_plugins::register_global(PLUGIN_NAME, provider_factory)
}

fn provider_factory() -> Result<Box<dyn BackendProvider>, PluginError> {
    Ok(Box::new(SimulatorProvider::new()))
}

/// Errors raised while answering a script request.
#[derive(Debug, Error)]
pub enum ScriptDispatchError {
    /// Writing the response to stdout failed.
    #[error("failed to write script response: {source}")]
    Write {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Serializing the response failed.
    #[error("failed to serialize script response: {source}")]
    Serialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
}

/// Answers one script request from `stdin` using `provider`.
///
/// Request failures are reported in the response; only failures to emit
/// the response itself are returned.
///
/// # Errors
///
/// Returns an error if the response cannot be serialized or written.
pub fn run_with_provider<P: BackendProvider>(
    stdin: &mut impl BufRead,
    stdout: &mut impl Write,
    provider: &P,
) -> Result<(), ScriptDispatchError> {
    let response = match read_request(stdin) {
        Ok(request) => execute_request(provider, &request),
        Err(message) => ScriptResponse::failure(
            ReasonCode::MalformedRequest,
            vec![ScriptDiagnostic::error(message)],
        ),
    };

    let payload = serde_json::to_string(&response)
        .map_err(|source| ScriptDispatchError::Serialize { source })?;
    stdout
        .write_all(payload.as_bytes())
        .map_err(|source| ScriptDispatchError::Write { source })?;
    stdout
        .write_all(b"\n")
        .map_err(|source| ScriptDispatchError::Write { source })?;
    stdout
        .flush()
        .map_err(|source| ScriptDispatchError::Write { source })
}

/// Answers one script request using the simulator provider.
///
/// # Errors
///
/// Returns an error if the response cannot be written.
pub fn run(stdin: &mut impl BufRead, stdout: &mut impl Write) -> Result<(), ScriptDispatchError> {
    run_with_provider(stdin, stdout, &SimulatorProvider::new())
}

fn read_request(stdin: &mut impl BufRead) -> Result<ScriptRequest, String> {
    let mut line = String::new();
    let bytes_read = stdin
        .read_line(&mut line)
        .map_err(|error| format!("failed to read request: {error}"))?;

    if bytes_read == 0 {
        return Err(String::from("script request was empty"));
    }

    serde_json::from_str(line.trim())
        .map_err(|error| format!("invalid script request JSON: {error}"))
}

fn execute_request<P: BackendProvider>(provider: &P, request: &ScriptRequest) -> ScriptResponse {
    if request.operation() != GET_BACKEND_OPERATION {
        return ScriptResponse::failure(
            ReasonCode::UnsupportedOperation,
            vec![ScriptDiagnostic::error(format!(
                "unsupported operation '{}'",
                request.operation()
            ))],
        );
    }
    match provider.get_backend(request.selection()) {
        Ok(backend) => ScriptResponse::success(backend.descriptor()),
        Err(PluginError::InvalidSelection { message, .. }) => ScriptResponse::failure(
            ReasonCode::InvalidSelection,
            vec![ScriptDiagnostic::error(message)],
        ),
        Err(error) => ScriptResponse::failure(
            ReasonCode::InternalError,
            vec![ScriptDiagnostic::error(error.to_string())],
        ),
    }
}
