//! CLI command handling
//!
//! Dispatches CLI commands to the app host and formats output.

pub mod spawn;

use colored::Colorize;
use serde_json::Value;

use crate::bridge::BridgeClient;
use crate::commands::Commands;
use crate::common::{config::Config, logging, Error, Result};
use crate::scenario::{self, run_scenario, ScenarioResult};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Host => {
            // Should never happen - host mode is handled in main
            unreachable!("Host command should be handled in main")
        }

        Commands::Run { scenarios, verbose } => {
            let config = Config::load()?;
            let mut results: Vec<ScenarioResult> = Vec::new();

            for path in &scenarios {
                let result = run_scenario(path, &config, verbose).await?;
                results.push(result);
            }

            let passed = results.iter().filter(|r| r.passed).count();
            let failed = results.len() - passed;

            println!("{}", "Summary:".cyan().bold());
            for result in &results {
                if result.passed {
                    println!(
                        "  {} {} ({}/{} steps)",
                        "✓".green(),
                        result.name,
                        result.steps_run,
                        result.steps_total
                    );
                } else {
                    println!(
                        "  {} {} ({}/{} steps): {}",
                        "✗".red(),
                        result.name,
                        result.steps_run,
                        result.steps_total,
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
            println!("{} passed, {} failed", passed, failed);

            if failed > 0 {
                return Err(Error::ScenarioFailures(failed));
            }
            Ok(())
        }

        Commands::Check { scenario } => {
            let content = std::fs::read_to_string(&scenario).map_err(|e| Error::FileRead {
                path: scenario.display().to_string(),
                error: e.to_string(),
            })?;

            let parsed: scenario::Scenario = serde_yaml::from_str(&content)?;
            println!("OK: {} ({} steps)", parsed.name, parsed.steps.len());
            Ok(())
        }

        Commands::Call { name, args } => {
            let config = Config::load()?;
            spawn::ensure_host_running(&config).await?;
            let mut client = BridgeClient::connect().await?;

            let result = client.invoke(&name, parse_json_args(&args)).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);

            Ok(())
        }

        Commands::Message { name, payload } => {
            let config = Config::load()?;
            spawn::ensure_host_running(&config).await?;
            let mut client = BridgeClient::connect().await?;

            let payload = match payload {
                Some(raw) => serde_json::from_str(&raw)
                    .map_err(|e| Error::Config(format!("Invalid JSON payload: {}", e)))?,
                None => Value::Null,
            };

            client.send_message(&name, payload).await?;
            println!("Message '{}' delivered", name);

            Ok(())
        }

        Commands::Status => {
            match BridgeClient::connect().await {
                Ok(mut client) => {
                    let status = client.status().await?;
                    println!("Host: running");
                    println!("App loaded: {}", status.app_loaded);
                    println!("Volumes: {}", status.volume_count);
                    println!("Recorded calls: {}", status.recorded_calls);
                    if let Some(log) = logging::host_log_path() {
                        if log.exists() {
                            println!("Log file: {}", log.display());
                        }
                    }
                }
                Err(Error::HostNotRunning) => {
                    println!("Host: not running");
                }
                Err(e) => return Err(e),
            }

            Ok(())
        }

        Commands::Stop => {
            let mut client = BridgeClient::connect().await?;
            client.shutdown().await?;
            println!("Host stopped");
            Ok(())
        }
    }
}

/// Parse CLI call arguments: each one as JSON, with bare words as strings
fn parse_json_args(args: &[String]) -> Vec<Value> {
    args.iter()
        .map(|raw| serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_args_mixes_json_and_bare_words() {
        let args = vec![
            "#file-list".to_string(),
            "3".to_string(),
            "true".to_string(),
            "[\"a\"]".to_string(),
        ];
        assert_eq!(
            parse_json_args(&args),
            vec![json!("#file-list"), json!(3), json!(true), json!(["a"])]
        );
    }
}
