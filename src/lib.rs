//! appdriver - scenario-driven integration test driver
//!
//! A scenario is an ordered sequence of asynchronous steps. The step runner
//! executes them strictly in order, forwarding each step's result to the
//! next, while steps drive an application under test over a remote-call
//! bridge and poll its state until conditions hold.

pub mod bridge;
pub mod cli;
pub mod commands;
pub mod common;
pub mod host;
pub mod runner;
pub mod scenario;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use runner::{pending, step, wait_for, Check, Step, StepContext, StepsRunner, WaitOptions};
