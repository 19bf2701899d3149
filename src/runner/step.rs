//! Step interface
//!
//! A step is one unit of action within a scenario. The value returned from
//! `execute` is the advancement signal: the runner forwards it as the next
//! step's input. Returning an error abandons the scenario.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::common::Result;

use super::context::StepContext;

/// A single unit of work in a scenario
#[async_trait]
pub trait Step: Send {
    /// Short label used in reports and error messages
    fn name(&self) -> &str;

    /// Perform the step's action against the context
    async fn execute(&mut self, ctx: &mut StepContext) -> Result<Value>;
}

/// Future type returned by closure steps
pub type StepFuture<'a> = BoxFuture<'a, Result<Value>>;

/// Adapter turning a closure into a [`Step`]
pub struct FnStep<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F> Step for FnStep<F>
where
    F: for<'a> FnMut(&'a mut StepContext) -> StepFuture<'a> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&mut self, ctx: &mut StepContext) -> Result<Value> {
        (self.f)(ctx).await
    }
}

/// Build a boxed closure step
pub fn step<F>(name: impl Into<String>, f: F) -> Box<dyn Step>
where
    F: for<'a> FnMut(&'a mut StepContext) -> StepFuture<'a> + Send + 'static,
{
    Box::new(FnStep {
        name: name.into(),
        f,
    })
}
