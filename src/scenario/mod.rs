//! Declarative YAML scenarios
//!
//! A scenario file names an ordered list of steps (invoke / message /
//! wait_for / assert) to drive the app under test. The runner compiles them
//! into step-runner steps so the strict sequencing and result forwarding of
//! the core engine apply unchanged.

mod config;
mod runner;

pub use config::{Condition, InvokeExpectation, Scenario, SetupStep, StepSpec, TargetConfig};
pub use runner::{run_parsed, run_scenario, ScenarioResult};
