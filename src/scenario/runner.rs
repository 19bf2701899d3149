//! Scenario runner implementation
//!
//! Compiles declarative YAML steps into runner steps and executes them with
//! the step runner against the app host, so assertions are made against
//! structured bridge results rather than parsed CLI output.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use colored::Colorize;
use serde_json::Value;
use tokio::process::Command as TokioCommand;

use crate::bridge::BridgeClient;
use crate::cli::spawn::ensure_host_running;
use crate::common::{config::Config, Error, Result};
use crate::runner::{Step, StepContext, StepsRunner, WaitOptions};

use super::config::{value_contains, Condition, InvokeExpectation, Scenario, StepSpec, TargetConfig};

/// Result of a scenario run
#[derive(Debug)]
pub struct ScenarioResult {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
}

/// Run a scenario from a YAML file
pub async fn run_scenario(path: &Path, config: &Config, verbose: bool) -> Result<ScenarioResult> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    let scenario: Scenario = serde_yaml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse scenario: {}", e)))?;

    run_parsed(scenario, config, verbose).await
}

/// Run an already-parsed scenario (integration tests build these in code)
pub async fn run_parsed(scenario: Scenario, config: &Config, verbose: bool) -> Result<ScenarioResult> {
    let steps_total = scenario.steps.len();

    println!(
        "\n{} {}",
        "Running Scenario:".blue().bold(),
        scenario.name.white().bold()
    );

    if let Some(desc) = &scenario.description {
        println!("  {}", desc.dimmed());
    }

    // Run setup steps
    if let Some(setup_steps) = &scenario.setup {
        println!("\n{}", "Setup:".cyan());
        for step in setup_steps {
            if verbose {
                println!("  $ {}", step.shell.dimmed());
            }

            let status = TokioCommand::new("sh")
                .arg("-c")
                .arg(&step.shell)
                .stdin(Stdio::null())
                .stdout(if verbose {
                    Stdio::inherit()
                } else {
                    Stdio::null()
                })
                .stderr(if verbose {
                    Stdio::inherit()
                } else {
                    Stdio::null()
                })
                .status()
                .await
                .map_err(|e| Error::Config(format!("Setup command failed to execute: {}", e)))?;

            if !status.success() {
                return Ok(ScenarioResult {
                    name: scenario.name.clone(),
                    passed: false,
                    steps_run: 0,
                    steps_total,
                    error: Some(format!(
                        "Setup command '{}' failed with exit code {:?}",
                        step.shell,
                        status.code()
                    )),
                });
            }
            println!("  {} {}", "✓".green(), step.shell.dimmed());
        }
    }

    // Reach the app under test
    let client = match scenario.target.mode.as_str() {
        "spawn" => {
            ensure_host_running(config).await?;
            connect(&scenario.target).await?
        }
        "connect" => connect(&scenario.target).await?,
        other => {
            return Err(Error::Config(format!(
                "Unknown target mode '{}'. Supported modes: 'spawn', 'connect'",
                other
            )));
        }
    };

    // Compile the declarative steps
    let defaults = config.wait_options();
    let runner = StepsRunner::from_steps(
        scenario
            .steps
            .into_iter()
            .enumerate()
            .map(|(i, spec)| compile_step(spec, i + 1, &defaults))
            .collect(),
    );

    println!("\n{}", "Steps:".cyan());

    let mut ctx = StepContext::with_bridge(client);
    match runner.run(&mut ctx).await {
        Ok(_) => {
            println!(
                "\n{} {}\n",
                "✓".green().bold(),
                "Scenario Passed".green().bold()
            );

            Ok(ScenarioResult {
                name: scenario.name,
                passed: true,
                steps_run: steps_total,
                steps_total,
                error: None,
            })
        }
        Err(Error::Step { index, name, source }) => {
            println!("  {} Step {}: {} - {}", "✗".red(), index, name, source);

            Ok(ScenarioResult {
                name: scenario.name,
                passed: false,
                steps_run: index,
                steps_total,
                error: Some(source.to_string()),
            })
        }
        Err(e) => Err(e),
    }
}

async fn connect(target: &TargetConfig) -> Result<BridgeClient> {
    match &target.socket {
        Some(socket) => BridgeClient::connect_to(socket).await,
        None => BridgeClient::connect().await,
    }
}

/// Compile one declarative step into a runner step
fn compile_step(spec: StepSpec, num: usize, defaults: &WaitOptions) -> Box<dyn Step> {
    match spec {
        StepSpec::Invoke { name, args, expect } => {
            let label = format!("invoke {}", name);
            Box::new(Reported::new(num, label, InvokeStep { name, args, expect }))
        }

        StepSpec::Message { name, payload } => {
            let label = format!("message {}", name);
            Box::new(Reported::new(num, label, MessageStep { name, payload }))
        }

        StepSpec::WaitFor {
            name,
            args,
            equals,
            contains,
            truthy,
            min_len,
            interval_ms,
            timeout_ms,
        } => {
            let mut options = defaults.clone();
            if let Some(ms) = interval_ms {
                options.interval = Duration::from_millis(ms);
            }
            if let Some(ms) = timeout_ms {
                options.timeout = Duration::from_millis(ms);
            }
            let condition = Condition {
                equals,
                contains,
                truthy,
                min_len,
            };
            let label = format!("wait_for {} ({})", name, condition.describe());
            Box::new(Reported::new(
                num,
                label,
                WaitForStep {
                    name,
                    args,
                    condition,
                    options,
                },
            ))
        }

        StepSpec::Assert {
            path,
            equals,
            contains,
            truthy,
            min_len,
        } => {
            let condition = Condition {
                equals,
                contains,
                truthy,
                min_len,
            };
            let label = match &path {
                Some(p) => format!("assert .{} ({})", p, condition.describe()),
                None => format!("assert ({})", condition.describe()),
            };
            Box::new(Reported::new(num, label, AssertStep { path, condition }))
        }
    }
}

/// Wrapper printing the per-step pass line after the inner step succeeds
struct Reported<S> {
    num: usize,
    label: String,
    inner: S,
}

impl<S> Reported<S> {
    fn new(num: usize, label: String, inner: S) -> Self {
        Self { num, label, inner }
    }
}

#[async_trait]
impl<S: Step> Step for Reported<S> {
    fn name(&self) -> &str {
        &self.label
    }

    async fn execute(&mut self, ctx: &mut StepContext) -> Result<Value> {
        let value = self.inner.execute(ctx).await?;
        println!("  {} Step {}: {}", "✓".green(), self.num, self.label.dimmed());
        Ok(value)
    }
}

struct InvokeStep {
    name: String,
    args: Vec<Value>,
    expect: Option<InvokeExpectation>,
}

#[async_trait]
impl Step for InvokeStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&mut self, ctx: &mut StepContext) -> Result<Value> {
        let result = ctx.bridge()?.invoke(&self.name, self.args.clone()).await;

        if let Some(expect) = &self.expect {
            if let Some(should_succeed) = expect.success {
                let did_succeed = result.is_ok();
                if should_succeed != did_succeed {
                    return Err(Error::expected(
                        &format!("call '{}' success", self.name),
                        should_succeed,
                        did_succeed,
                    ));
                }
                if !should_succeed {
                    // Expected failure; swallow the error and forward null
                    return Ok(Value::Null);
                }
            }
        }

        let value = result?;

        if let Some(expect) = &self.expect {
            if let Some(expected) = &expect.equals {
                if &value != expected {
                    return Err(Error::expected(
                        &format!("result of '{}'", self.name),
                        expected,
                        &value,
                    ));
                }
            }
            if let Some(needle) = &expect.contains {
                if !value_contains(&value, needle) {
                    return Err(Error::expected(
                        &format!("result of '{}'", self.name),
                        format!("containing \"{}\"", needle),
                        &value,
                    ));
                }
            }
        }

        Ok(value)
    }
}

struct MessageStep {
    name: String,
    payload: Value,
}

#[async_trait]
impl Step for MessageStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&mut self, ctx: &mut StepContext) -> Result<Value> {
        ctx.bridge()?
            .send_message(&self.name, self.payload.clone())
            .await
    }
}

struct WaitForStep {
    name: String,
    args: Vec<Value>,
    condition: Condition,
    options: WaitOptions,
}

#[async_trait]
impl Step for WaitForStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&mut self, ctx: &mut StepContext) -> Result<Value> {
        let condition = self.condition.clone();
        ctx.bridge()?
            .wait_until(&self.name, self.args.clone(), &self.options, move |value| {
                condition.matches(value)
            })
            .await
    }
}

struct AssertStep {
    path: Option<String>,
    condition: Condition,
}

#[async_trait]
impl Step for AssertStep {
    fn name(&self) -> &str {
        "assert"
    }

    async fn execute(&mut self, ctx: &mut StepContext) -> Result<Value> {
        let value = lookup(ctx.input(), self.path.as_deref())?;

        if !self.condition.matches(&value) {
            return Err(Error::expected(
                "forwarded value",
                self.condition.describe(),
                &value,
            ));
        }

        // Forward the previous step's value unchanged so later asserts
        // see the same input
        Ok(ctx.input().clone())
    }
}

/// Resolve a dot-path into a value; numeric segments index arrays
fn lookup(value: &Value, path: Option<&str>) -> Result<Value> {
    let Some(path) = path else {
        return Ok(value.clone());
    };

    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment).ok_or_else(|| {
                Error::Assertion(format!("field '{}' not found in {}", segment, current))
            })?,
            Value::Array(items) => {
                let index: usize = segment.parse().map_err(|_| {
                    Error::Assertion(format!(
                        "cannot index array with non-numeric segment '{}'",
                        segment
                    ))
                })?;
                items.get(index).ok_or_else(|| {
                    Error::Assertion(format!(
                        "index {} out of bounds (length {})",
                        index,
                        items.len()
                    ))
                })?
            }
            other => {
                return Err(Error::Assertion(format!(
                    "cannot index into {} with '{}'",
                    other, segment
                )));
            }
        };
    }

    Ok(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_without_path_returns_value() {
        let value = json!({"a": 1});
        assert_eq!(lookup(&value, None).unwrap(), value);
    }

    #[test]
    fn test_lookup_descends_objects_and_arrays() {
        let value = json!({"rows": [{"name": "hello.txt"}, {"name": "photos"}]});
        assert_eq!(lookup(&value, Some("rows.1.name")).unwrap(), json!("photos"));
    }

    #[test]
    fn test_lookup_missing_field_is_an_assertion_error() {
        let value = json!({"a": 1});
        let err = lookup(&value, Some("b")).unwrap_err();
        assert!(matches!(err, Error::Assertion(_)));
    }

    #[tokio::test]
    async fn test_assert_step_checks_forwarded_value() {
        let mut ctx = StepContext::new();
        ctx.set_input(json!({"count": 3}));

        let mut step = AssertStep {
            path: Some("count".to_string()),
            condition: Condition {
                equals: Some(json!(3)),
                ..Condition::default()
            },
        };
        let forwarded = step.execute(&mut ctx).await.unwrap();
        assert_eq!(forwarded, json!({"count": 3}));

        let mut failing = AssertStep {
            path: Some("count".to_string()),
            condition: Condition {
                equals: Some(json!(4)),
                ..Condition::default()
            },
        };
        let err = failing.execute(&mut ctx).await.unwrap_err();
        match err {
            Error::Assertion(message) => {
                assert!(message.contains("expected equals 4"), "message: {}", message);
                assert!(message.contains("got 3"), "message: {}", message);
            }
            other => panic!("expected Assertion, got {:?}", other),
        }
    }
}
