//! App host process standing in for the application under test
//!
//! Runs as the hidden `appdriver host` subcommand, auto-spawned by the CLI.
//! Serves the bridge protocol against a small mutable application model so
//! that scenarios have real asynchronous state to drive and poll.

mod app;
mod server;

pub use app::AppModel;
pub use server::{run, Host};
