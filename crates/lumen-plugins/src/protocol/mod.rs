//! JSONL protocol spoken between the harness and a backend script.
//!
//! The harness writes one [`ScriptRequest`] line to the script's stdin and
//! closes it. The script writes one [`ScriptResponse`] line to stdout and
//! exits. Script stderr is captured for diagnostic logging but is not part
//! of the protocol.

use serde::{Deserialize, Serialize};

use crate::provider::BackendDescriptor;

/// Operation name asking a script for a backend.
pub const GET_BACKEND_OPERATION: &str = "get_backend";

/// Request sent to a backend script on stdin.
///
/// # Example
///
/// ```
/// use lumen_plugins::protocol::ScriptRequest;
///
/// let request = ScriptRequest::get_backend(Some("method=statevector"));
/// assert_eq!(request.operation(), "get_backend");
/// assert_eq!(request.selection(), Some("method=statevector"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScriptRequest {
    operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selection: Option<String>,
}

impl ScriptRequest {
    /// Creates a request for an arbitrary operation.
    #[must_use]
    pub fn new(operation: impl Into<String>, selection: Option<&str>) -> Self {
        Self {
            operation: operation.into(),
            selection: selection.map(str::to_owned),
        }
    }

    /// Creates a `get_backend` request.
    #[must_use]
    pub fn get_backend(selection: Option<&str>) -> Self {
        Self::new(GET_BACKEND_OPERATION, selection)
    }

    /// Returns the operation name.
    #[must_use]
    pub const fn operation(&self) -> &str {
        self.operation.as_str()
    }

    /// Returns the selection string, if any.
    #[must_use]
    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }
}

/// Response written by a backend script on stdout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScriptResponse {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backend: Option<BackendDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason_code: Option<ReasonCode>,
    #[serde(default)]
    diagnostics: Vec<ScriptDiagnostic>,
}

impl ScriptResponse {
    /// Creates a successful response carrying `backend`.
    #[must_use]
    pub const fn success(backend: BackendDescriptor) -> Self {
        Self {
            success: true,
            backend: Some(backend),
            reason_code: None,
            diagnostics: Vec::new(),
        }
    }

    /// Creates a failed response.
    #[must_use]
    pub const fn failure(reason_code: ReasonCode, diagnostics: Vec<ScriptDiagnostic>) -> Self {
        Self {
            success: false,
            backend: None,
            reason_code: Some(reason_code),
            diagnostics,
        }
    }

    /// Returns whether the script completed successfully.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the backend descriptor.
    #[must_use]
    pub const fn backend(&self) -> Option<&BackendDescriptor> {
        self.backend.as_ref()
    }

    /// Returns the machine-readable failure reason.
    #[must_use]
    pub const fn reason_code(&self) -> Option<ReasonCode> {
        self.reason_code
    }

    /// Returns the diagnostic messages.
    #[must_use]
    pub fn diagnostics(&self) -> &[ScriptDiagnostic] {
        &self.diagnostics
    }

    /// Joins diagnostic messages into one line.
    #[must_use]
    pub fn diagnostic_summary(&self) -> String {
        self.diagnostics
            .iter()
            .map(ScriptDiagnostic::message)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Machine-readable reason for a failed script response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// The selection string names nothing the script recognises.
    InvalidSelection,
    /// The request named an operation the script does not implement.
    UnsupportedOperation,
    /// The request line could not be parsed.
    MalformedRequest,
    /// The script failed for an internal reason.
    InternalError,
}

/// A diagnostic message emitted by a script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScriptDiagnostic {
    severity: DiagnosticSeverity,
    message: String,
}

impl ScriptDiagnostic {
    /// Creates a diagnostic with the given severity and message.
    #[must_use]
    pub fn new(severity: DiagnosticSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    /// Shorthand for an error-level diagnostic.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Error, message)
    }

    /// Returns the severity level.
    #[must_use]
    pub const fn severity(&self) -> DiagnosticSeverity {
        self.severity
    }

    /// Returns the message text.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Severity level for script diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSeverity {
    /// A fatal error that prevented the script from completing.
    Error,
    /// A non-fatal warning.
    Warning,
    /// An informational message.
    Info,
}
