//! Sequential async step execution
//!
//! A scenario is an ordered sequence of steps. The runner executes them
//! strictly in order on the tokio runtime: step *k+1* never begins before
//! step *k* has returned its outcome, and that outcome becomes the next
//! step's input. There is no runner-level retry; retrying lives in the
//! [`wait_for`] poll helper inside individual steps.
//!
//! The runner has no intrinsic stall detection: a step whose future never
//! resolves hangs the scenario until the calling harness aborts it. Timeout
//! policy is deliberately the harness's responsibility.

mod context;
mod step;
mod wait;

pub use context::StepContext;
pub use step::{step, FnStep, Step, StepFuture};
pub use wait::{pending, wait_for, Check, WaitOptions};

use serde_json::Value;

use crate::common::{Error, Result};

/// Executes an ordered sequence of steps, one at a time
pub struct StepsRunner {
    steps: Vec<Box<dyn Step>>,
}

impl StepsRunner {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn from_steps(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    /// Append a step to the sequence (before the scenario starts)
    pub fn push(&mut self, step: Box<dyn Step>) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run all steps in declaration order.
    ///
    /// Consumes the runner: a scenario is immutable once started and
    /// terminal once it reaches the end of the sequence or any step fails.
    /// On failure the error is wrapped in [`Error::Step`] naming the 1-based
    /// index and label of the failing step; remaining steps never execute.
    /// Resolves with the value forwarded by the last step.
    pub async fn run(mut self, ctx: &mut StepContext) -> Result<Value> {
        let total = self.steps.len();

        for (i, step) in self.steps.iter_mut().enumerate() {
            let index = i + 1;
            let name = step.name().to_string();
            tracing::debug!(step = index, total, name = %name, "executing step");

            let value = step
                .execute(ctx)
                .await
                .map_err(|e| Error::in_step(index, &name, e))?;
            ctx.set_input(value);
        }

        Ok(ctx.input().clone())
    }
}

impl Default for StepsRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn recorder() -> (Arc<Mutex<Vec<usize>>>, impl Fn() -> Vec<usize>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reader = {
            let log = log.clone();
            move || log.lock().unwrap().clone()
        };
        (log, reader)
    }

    #[tokio::test]
    async fn test_steps_execute_in_declaration_order() {
        let (log, entries) = recorder();
        let mut runner = StepsRunner::new();

        for id in 1..=3usize {
            let log = log.clone();
            runner.push(step(format!("record {}", id), move |_ctx: &mut StepContext| {
                let log = log.clone();
                async move {
                    // Yield through the event loop before recording so an
                    // overlapping execution would scramble the order.
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    log.lock().unwrap().push(id);
                    Ok(Value::Null)
                }
                .boxed()
            }));
        }

        let mut ctx = StepContext::new();
        runner.run(&mut ctx).await.unwrap();
        assert_eq!(entries(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_forwarded_value_reaches_next_step() {
        let mut runner = StepsRunner::new();
        runner.push(step("produce", |_ctx: &mut StepContext| async { Ok(json!(5)) }.boxed()));
        runner.push(step("consume", |ctx: &mut StepContext| {
            async move {
                let n = ctx.input().as_i64().unwrap();
                assert_eq!(n, 5);
                Ok(json!(n * 2))
            }
            .boxed()
        }));

        let mut ctx = StepContext::new();
        let result = runner.run(&mut ctx).await.unwrap();
        assert_eq!(result, json!(10));
    }

    #[tokio::test]
    async fn test_first_step_receives_null_input() {
        let mut runner = StepsRunner::new();
        runner.push(step("inspect", |ctx: &mut StepContext| {
            async move {
                assert!(ctx.input().is_null());
                Ok(json!("ok"))
            }
            .boxed()
        }));

        let mut ctx = StepContext::new();
        assert_eq!(runner.run(&mut ctx).await.unwrap(), json!("ok"));
    }

    #[tokio::test]
    async fn test_failing_step_aborts_remaining_steps() {
        let (log, entries) = recorder();
        let mut runner = StepsRunner::new();

        runner.push(step("first", |_ctx: &mut StepContext| async { Ok(Value::Null) }.boxed()));
        runner.push(step("explode", |_ctx: &mut StepContext| {
            async { Err(Error::Assertion("row count: expected 3, got 2".to_string())) }.boxed()
        }));
        {
            let log = log.clone();
            runner.push(step("never runs", move |_ctx: &mut StepContext| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(3);
                    Ok(Value::Null)
                }
                .boxed()
            }));
        }

        let mut ctx = StepContext::new();
        let err = runner.run(&mut ctx).await.unwrap_err();

        match err {
            Error::Step { index, name, source } => {
                assert_eq!(index, 2);
                assert_eq!(name, "explode");
                assert!(matches!(*source, Error::Assertion(_)));
            }
            other => panic!("expected Step error, got {:?}", other),
        }
        assert!(entries().is_empty(), "step 3 must never execute");
    }

    #[tokio::test]
    async fn test_empty_scenario_resolves_null() {
        let mut ctx = StepContext::new();
        let result = StepsRunner::new().run(&mut ctx).await.unwrap();
        assert!(result.is_null());
    }
}
