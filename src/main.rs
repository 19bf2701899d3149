//! appdriver - scenario-driven integration test driver
//!
//! Drives an application under test through ordered scenario steps over a
//! remote-call bridge, polling app state until conditions hold.

use appdriver::{cli, commands::Commands, common::logging, host};
use clap::Parser;

#[derive(Parser)]
#[command(name = "appdriver", about = "Scenario-driven integration test driver")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Host => {
            if let Some(log_file) = logging::init_host() {
                tracing::info!("Host logging to {}", log_file.display());
            }
            host::run().await
        }
        command => {
            logging::init_cli();
            cli::dispatch(command).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
