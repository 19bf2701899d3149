//! Scenario context threaded through steps
//!
//! Replaces the closure-captured globals a test author would otherwise reach
//! for: the context is owned by the runner, handed to each step in turn, and
//! mutated only through step return values.

use serde_json::Value;

use crate::bridge::BridgeClient;
use crate::common::{Error, Result};

/// Mutable scenario state owned by the runner
pub struct StepContext {
    input: Value,
    bridge: Option<BridgeClient>,
}

impl StepContext {
    /// Context with no bridge attached (library/unit-test use)
    pub fn new() -> Self {
        Self {
            input: Value::Null,
            bridge: None,
        }
    }

    /// Context carrying a bridge connection to the app under test
    pub fn with_bridge(bridge: BridgeClient) -> Self {
        Self {
            input: Value::Null,
            bridge: Some(bridge),
        }
    }

    /// Value forwarded by the previous step (null for the first step)
    pub fn input(&self) -> &Value {
        &self.input
    }

    pub(crate) fn set_input(&mut self, value: Value) {
        self.input = value;
    }

    /// Bridge connection to the app under test
    pub fn bridge(&mut self) -> Result<&mut BridgeClient> {
        self.bridge.as_mut().ok_or(Error::BridgeNotAttached)
    }

    /// Tear down the context, returning the bridge connection if any
    pub fn into_bridge(self) -> Option<BridgeClient> {
        self.bridge
    }
}

impl Default for StepContext {
    fn default() -> Self {
        Self::new()
    }
}
