//! Host spawning logic
//!
//! Automatically spawns the app host process when needed, using the same
//! binary with the hidden `host` subcommand.

use std::time::Duration;

use crate::bridge::{transport, BridgeClient};
use crate::common::{config::Config, paths, Error, Result};

/// Ensure the host is running, spawning it if necessary
pub async fn ensure_host_running(config: &Config) -> Result<()> {
    // Try to connect first
    match BridgeClient::connect().await {
        Ok(_) => return Ok(()), // Already running
        Err(Error::HostNotRunning) => {
            // Need to spawn
            spawn_host(config.timeouts.spawn_secs).await?;
        }
        Err(e) => return Err(e),
    }

    Ok(())
}

/// Spawn the host process
async fn spawn_host(timeout_secs: u64) -> Result<()> {
    tracing::debug!("Spawning host process");

    // Get path to current executable
    let exe_path = std::env::current_exe().map_err(|e| {
        Error::Internal(format!("Failed to get current executable path: {}", e))
    })?;

    // Ensure socket directory exists
    paths::ensure_socket_dir()?;

    // Remove stale socket if it exists
    paths::remove_socket()?;

    // Spawn detached process with output redirected to /dev/null
    // The host logs to its own log file, so we don't need terminal output
    #[cfg(unix)]
    {
        use std::fs::File;
        use std::os::unix::process::CommandExt;

        let dev_null = File::open("/dev/null")
            .map_err(|e| Error::Internal(format!("Failed to open /dev/null: {}", e)))?;
        let dev_null_out = File::create("/dev/null")
            .map_err(|e| Error::Internal(format!("Failed to open /dev/null for write: {}", e)))?;
        let dev_null_err = dev_null_out
            .try_clone()
            .map_err(|e| Error::Internal(format!("Failed to clone /dev/null handle: {}", e)))?;

        std::process::Command::new(&exe_path)
            .arg("host")
            .stdin(std::process::Stdio::from(dev_null))
            .stdout(std::process::Stdio::from(dev_null_out))
            .stderr(std::process::Stdio::from(dev_null_err))
            .process_group(0) // New process group (detach from terminal)
            .spawn()
            .map_err(|e| Error::Internal(format!("Failed to spawn host: {}", e)))?;
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const DETACHED_PROCESS: u32 = 0x00000008;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x00000200;
        std::process::Command::new(&exe_path)
            .arg("host")
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP)
            .spawn()
            .map_err(|e| Error::Internal(format!("Failed to spawn host: {}", e)))?;
    }

    // Wait for the host to start accepting connections
    let deadline = std::time::Instant::now() + Duration::from_secs(timeout_secs);

    loop {
        if std::time::Instant::now() >= deadline {
            return Err(Error::HostSpawnTimeout(timeout_secs));
        }

        tokio::time::sleep(Duration::from_millis(50)).await;

        // Check if socket exists (Unix only)
        #[cfg(unix)]
        if !paths::socket_path().exists() {
            continue;
        }

        // Try to connect
        match transport::connect().await {
            Ok(_) => {
                tracing::debug!("Host started successfully");
                return Ok(());
            }
            Err(_) => continue,
        }
    }
}
