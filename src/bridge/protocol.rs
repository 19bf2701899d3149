//! Bridge protocol message types
//!
//! Defines the request/response format for harness ↔ app host
//! communication. Uses a simple length-prefixed JSON protocol; operations
//! inside the app are invoked by name.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::error::WireError;

/// Bridge request from harness to host
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for matching responses
    pub id: u64,
    /// The call to execute
    pub call: Call,
}

/// Bridge response from host to harness
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    /// Request ID this response corresponds to
    pub id: u64,
    /// Whether the call succeeded
    pub success: bool,
    /// Result data on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error information on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl Response {
    /// Create a success response
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: u64, error: WireError) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(error),
        }
    }

    /// Create a success response with no data
    pub fn ok(id: u64) -> Self {
        Self {
            id,
            success: true,
            result: Some(serde_json::json!({})),
            error: None,
        }
    }
}

/// Calls that can be sent from the harness to the app host
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Call {
    /// Invoke a named operation inside the app and return its result
    Invoke {
        name: String,
        #[serde(default)]
        args: Vec<Value>,
    },

    /// Deliver an out-of-band control message to the host. May trigger
    /// state changes that land after a delay; callers poll for the effect.
    Message {
        name: String,
        #[serde(default)]
        payload: Value,
    },

    /// Probe host liveness and app state
    Status,

    /// Shut the host down
    Shutdown,
}

/// Status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResult {
    pub app_loaded: bool,
    pub volume_count: usize,
    pub recorded_calls: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invoke_parses_without_args() {
        let call: Call =
            serde_json::from_value(json!({"type": "invoke", "name": "volumeCount"})).unwrap();
        match call {
            Call::Invoke { name, args } => {
                assert_eq!(name, "volumeCount");
                assert!(args.is_empty());
            }
            _ => panic!("Expected Invoke variant"),
        }
    }

    #[test]
    fn test_message_defaults_payload_to_null() {
        let call: Call =
            serde_json::from_value(json!({"type": "message", "name": "unmountAllVolumes"}))
                .unwrap();
        match call {
            Call::Message { name, payload } => {
                assert_eq!(name, "unmountAllVolumes");
                assert!(payload.is_null());
            }
            _ => panic!("Expected Message variant"),
        }
    }

    #[test]
    fn test_error_response_skips_result_field() {
        let response = Response::error(
            3,
            WireError {
                code: "CALL_FAILED".to_string(),
                message: "no such element".to_string(),
            },
        );
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("result").is_none());
        assert_eq!(value["error"]["code"], "CALL_FAILED");
    }
}
