//! Scenario file configuration types
//!
//! Defines the data structures for deserializing YAML scenarios.

use serde::Deserialize;
use serde_json::Value;

/// A complete scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct Scenario {
    /// Name of the scenario
    pub name: String,
    /// Optional description of what the scenario verifies
    pub description: Option<String>,
    /// Optional setup steps to run before the scenario (e.g., fixtures)
    pub setup: Option<Vec<SetupStep>>,
    /// Configuration for reaching the app under test
    #[serde(default)]
    pub target: TargetConfig,
    /// The sequence of steps to execute
    pub steps: Vec<StepSpec>,
}

/// A setup step that runs before the scenario
#[derive(Deserialize, Debug)]
pub struct SetupStep {
    /// Shell command to execute
    pub shell: String,
}

/// Configuration for reaching the app under test
#[derive(Deserialize, Debug)]
pub struct TargetConfig {
    /// Bridge mode: "spawn" (default, auto-spawn the host) or "connect"
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Explicit socket name to connect to (defaults to the host socket)
    pub socket: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            socket: None,
        }
    }
}

fn default_mode() -> String {
    "spawn".to_string()
}

/// A single step in the scenario flow
#[derive(Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepSpec {
    /// Invoke a named operation over the bridge
    Invoke {
        /// Operation name (e.g. "click", "fileList")
        name: String,
        /// Operation arguments
        #[serde(default)]
        args: Vec<Value>,
        /// Optional expectations for the result
        expect: Option<InvokeExpectation>,
    },
    /// Deliver a control message to the host
    Message {
        /// Message name (e.g. "mountVolume")
        name: String,
        /// Message payload
        #[serde(default)]
        payload: Value,
    },
    /// Poll an operation until its result satisfies a condition
    WaitFor {
        /// Operation name to poll
        name: String,
        /// Operation arguments
        #[serde(default)]
        args: Vec<Value>,
        /// Expected result (exact match)
        equals: Option<Value>,
        /// Expected substring/element
        contains: Option<String>,
        /// Expected truthiness
        truthy: Option<bool>,
        /// Minimum length for arrays/strings
        min_len: Option<usize>,
        /// Poll interval in milliseconds (default from config)
        interval_ms: Option<u64>,
        /// Total timeout in milliseconds (default from config)
        timeout_ms: Option<u64>,
    },
    /// Assert on the value forwarded by the previous step
    Assert {
        /// Optional dot-path into the forwarded value
        path: Option<String>,
        /// Expected value (exact match)
        equals: Option<Value>,
        /// Expected substring/element
        contains: Option<String>,
        /// Expected truthiness
        truthy: Option<bool>,
        /// Minimum length for arrays/strings
        min_len: Option<usize>,
    },
}

/// Expectations for an invoke result
#[derive(Deserialize, Debug, Default, Clone)]
pub struct InvokeExpectation {
    /// Whether the call should succeed. Set to false to test error paths;
    /// the failure is then swallowed instead of aborting the scenario.
    pub success: Option<bool>,
    /// Expected result (exact match)
    pub equals: Option<Value>,
    /// Expected substring/element
    pub contains: Option<String>,
}

/// A value condition shared by wait_for and assert steps
#[derive(Debug, Clone, Default)]
pub struct Condition {
    pub equals: Option<Value>,
    pub contains: Option<String>,
    pub truthy: Option<bool>,
    pub min_len: Option<usize>,
}

impl Condition {
    /// True when every declared expectation holds for `value`
    pub fn matches(&self, value: &Value) -> bool {
        if let Some(expected) = &self.equals {
            if value != expected {
                return false;
            }
        }
        if let Some(needle) = &self.contains {
            if !value_contains(value, needle) {
                return false;
            }
        }
        if let Some(expected) = self.truthy {
            if is_truthy(value) != expected {
                return false;
            }
        }
        if let Some(min) = self.min_len {
            let len = match value {
                Value::Array(items) => items.len(),
                Value::String(s) => s.len(),
                _ => return false,
            };
            if len < min {
                return false;
            }
        }
        true
    }

    /// Human-readable form for assertion messages
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(expected) = &self.equals {
            parts.push(format!("equals {}", expected));
        }
        if let Some(needle) = &self.contains {
            parts.push(format!("contains \"{}\"", needle));
        }
        if let Some(expected) = self.truthy {
            parts.push(if expected { "truthy" } else { "falsy" }.to_string());
        }
        if let Some(min) = self.min_len {
            parts.push(format!("length >= {}", min));
        }
        if parts.is_empty() {
            "anything".to_string()
        } else {
            parts.join(" and ")
        }
    }
}

/// JSON truthiness: null, false, 0, "", [] and {} are falsy
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Substring check on strings, any-element check on arrays, and a
/// serialized-form fallback for everything else
pub(crate) fn value_contains(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.contains(needle),
        Value::Array(items) => items.iter().any(|item| value_contains(item, needle)),
        other => other.to_string().contains(needle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_minimal_scenario() {
        let scenario: Scenario = serde_yaml::from_str(
            r#"
name: file list shows entries
steps:
  - action: invoke
    name: fileList
  - action: assert
    min_len: 1
"#,
        )
        .unwrap();

        assert_eq!(scenario.name, "file list shows entries");
        assert_eq!(scenario.target.mode, "spawn");
        assert_eq!(scenario.steps.len(), 2);
        assert!(matches!(scenario.steps[0], StepSpec::Invoke { .. }));
        assert!(matches!(scenario.steps[1], StepSpec::Assert { .. }));
    }

    #[test]
    fn test_parse_wait_for_with_overrides() {
        let scenario: Scenario = serde_yaml::from_str(
            r#"
name: waits
steps:
  - action: wait_for
    name: volumeCount
    equals: 2
    interval_ms: 20
    timeout_ms: 500
"#,
        )
        .unwrap();

        match &scenario.steps[0] {
            StepSpec::WaitFor {
                name,
                equals,
                interval_ms,
                timeout_ms,
                ..
            } => {
                assert_eq!(name, "volumeCount");
                assert_eq!(equals.as_ref().unwrap(), &json!(2));
                assert_eq!(*interval_ms, Some(20));
                assert_eq!(*timeout_ms, Some(500));
            }
            other => panic!("Expected WaitFor variant, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_expected_failure() {
        let scenario: Scenario = serde_yaml::from_str(
            r#"
name: failure path
steps:
  - action: invoke
    name: teleport
    expect:
      success: false
"#,
        )
        .unwrap();

        match &scenario.steps[0] {
            StepSpec::Invoke { expect, .. } => {
                assert_eq!(expect.as_ref().unwrap().success, Some(false));
            }
            other => panic!("Expected Invoke variant, got {:?}", other),
        }
    }

    #[test]
    fn test_condition_equals_and_truthy() {
        let condition = Condition {
            equals: Some(json!(3)),
            ..Condition::default()
        };
        assert!(condition.matches(&json!(3)));
        assert!(!condition.matches(&json!(2)));

        let condition = Condition {
            truthy: Some(false),
            ..Condition::default()
        };
        assert!(condition.matches(&json!([])));
        assert!(condition.matches(&Value::Null));
        assert!(!condition.matches(&json!(["x"])));
    }

    #[test]
    fn test_condition_contains_descends_into_arrays() {
        let condition = Condition {
            contains: Some("hello".to_string()),
            ..Condition::default()
        };
        assert!(condition.matches(&json!(["photos", "hello.txt"])));
        assert!(!condition.matches(&json!(["photos"])));
    }

    #[test]
    fn test_condition_min_len_rejects_scalars() {
        let condition = Condition {
            min_len: Some(1),
            ..Condition::default()
        };
        assert!(condition.matches(&json!(["a"])));
        assert!(!condition.matches(&json!([])));
        assert!(!condition.matches(&json!(5)));
    }
}
