//! Error types for the scenario driver
//!
//! Error messages name the failing expectation or the unsatisfied wait so a
//! scenario failure can be diagnosed from the message alone.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the scenario driver
#[derive(Error, Debug)]
pub enum Error {
    // === Host/Connection Errors ===
    #[error("App host not running. It is spawned automatically by 'appdriver run <scenario>'")]
    HostNotRunning,

    #[error("Failed to spawn app host: timed out waiting for socket after {0} seconds")]
    HostSpawnTimeout(u64),

    #[error("Failed to connect to app host: {0}")]
    HostConnectionFailed(#[source] io::Error),

    #[error("Bridge communication error: {0}")]
    BridgeCommunication(String),

    #[error("Bridge protocol error: {0}")]
    Protocol(String),

    // === Remote Call Errors ===
    #[error("Remote call '{name}' failed: {message}")]
    CallFailed { name: String, message: String },

    #[error("Unknown remote operation '{0}'")]
    UnknownOperation(String),

    // === Runner Errors ===
    #[error("Step {index} ({name}) failed: {source}")]
    Step {
        index: usize,
        name: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Scenario has no bridge connection attached")]
    BridgeNotAttached,

    // === Wait/Timeout Errors ===
    #[error("Condition not satisfied after {waited_ms}ms: {last}")]
    WaitTimeout { waited_ms: u64, last: String },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    // === Assertion Errors ===
    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("{0} scenario(s) failed")]
    ScenarioFailures(usize),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an assertion error with an expected-vs-actual message
    pub fn expected<E: std::fmt::Display, A: std::fmt::Display>(
        what: &str,
        expected: E,
        actual: A,
    ) -> Self {
        Self::Assertion(format!("{}: expected {}, got {}", what, expected, actual))
    }

    /// Create a remote call failure
    pub fn call_failed(name: &str, message: &str) -> Self {
        Self::CallFailed {
            name: name.to_string(),
            message: message.to_string(),
        }
    }

    /// Wrap an error with the step that produced it
    pub fn in_step(index: usize, name: &str, source: Error) -> Self {
        Self::Step {
            index,
            name: name.to_string(),
            source: Box::new(source),
        }
    }
}

/// Wire-serializable error for host responses
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WireError {
    pub code: String,
    pub message: String,
}

impl From<&Error> for WireError {
    fn from(e: &Error) -> Self {
        let code = match e {
            Error::HostNotRunning => "HOST_NOT_RUNNING",
            Error::UnknownOperation(_) => "UNKNOWN_OPERATION",
            Error::CallFailed { .. } => "CALL_FAILED",
            Error::Assertion(_) => "ASSERTION",
            Error::WaitTimeout { .. } | Error::Timeout(_) => "TIMEOUT",
            Error::Protocol(_) => "PROTOCOL_ERROR",
            _ => "INTERNAL_ERROR",
        }
        .to_string();

        Self {
            code,
            message: e.to_string(),
        }
    }
}

impl From<WireError> for Error {
    fn from(e: WireError) -> Self {
        // Map wire errors back to our error types where possible
        match e.code.as_str() {
            "TIMEOUT" => Error::Timeout(0),
            "ASSERTION" => Error::Assertion(e.message),
            "PROTOCOL_ERROR" => Error::Protocol(e.message),
            _ => Error::BridgeCommunication(e.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_message_names_both_sides() {
        let e = Error::expected("file list", "[\"a\"]", "[\"b\"]");
        assert_eq!(
            e.to_string(),
            "Assertion failed: file list: expected [\"a\"], got [\"b\"]"
        );
    }

    #[test]
    fn test_wire_roundtrip_preserves_taxonomy() {
        let wire = WireError::from(&Error::WaitTimeout {
            waited_ms: 100,
            last: "volume count".to_string(),
        });
        assert_eq!(wire.code, "TIMEOUT");
        assert!(matches!(Error::from(wire), Error::Timeout(_)));
    }
}
