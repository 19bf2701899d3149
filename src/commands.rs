//! CLI command definitions
//!
//! Defines the clap commands for the scenario driver.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run one or more scenario files
    Run {
        /// Paths to YAML scenario files
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,

        /// Show setup command output and extra detail
        #[arg(long, short)]
        verbose: bool,
    },

    /// Validate a scenario file without running it
    Check {
        /// Path to the YAML scenario file
        scenario: PathBuf,
    },

    /// Invoke a single operation in the app
    Call {
        /// Operation name (e.g. "volumeCount", "click")
        name: String,

        /// Arguments, each parsed as JSON (bare words become strings)
        args: Vec<String>,
    },

    /// Deliver a control message to the host
    Message {
        /// Message name (e.g. "mountVolume")
        name: String,

        /// JSON payload
        payload: Option<String>,
    },

    /// Show host status
    Status,

    /// Stop the app host
    Stop,

    /// Run the app host process (spawned automatically)
    #[command(hide = true)]
    Host,
}
