//! Configuration file handling

use serde::Deserialize;
use std::time::Duration;

use crate::runner::WaitOptions;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Polling defaults for wait_for steps
    #[serde(default)]
    pub defaults: Defaults,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Host settings
    #[serde(default)]
    pub host: HostConfig,
}

/// Default polling settings
#[derive(Debug, Deserialize)]
pub struct Defaults {
    /// Poll interval for wait_for steps, in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Total wait_for timeout, in seconds
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            wait_timeout_secs: default_wait_timeout(),
        }
    }
}

fn default_interval_ms() -> u64 {
    100
}
fn default_wait_timeout() -> u64 {
    10
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// Timeout for a single bridge call
    #[serde(default = "default_call")]
    pub call_secs: u64,

    /// Timeout for the host to come up after spawning
    #[serde(default = "default_spawn")]
    pub spawn_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            call_secs: default_call(),
            spawn_secs: default_spawn(),
        }
    }
}

fn default_call() -> u64 {
    30
}
fn default_spawn() -> u64 {
    5
}

/// Host configuration
#[derive(Debug, Deserialize)]
pub struct HostConfig {
    /// Auto-exit after this many minutes with no client activity
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_minutes: u64,

    /// Delay before the hosted app reports itself loaded, in milliseconds
    #[serde(default = "default_startup_delay")]
    pub startup_delay_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            idle_timeout_minutes: default_idle_timeout(),
            startup_delay_ms: default_startup_delay(),
        }
    }
}

fn default_idle_timeout() -> u64 {
    30
}
fn default_startup_delay() -> u64 {
    150
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    super::Error::FileRead {
                        path: path.display().to_string(),
                        error: e.to_string(),
                    }
                })?;
                return toml::from_str(&content)
                    .map_err(|e| super::Error::ConfigParse(e.to_string()));
            }
        }
        Ok(Self::default())
    }

    /// Wait options built from the configured polling defaults
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::new()
            .interval(Duration::from_millis(self.defaults.interval_ms))
            .timeout(Duration::from_secs(self.defaults.wait_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.defaults.interval_ms, 100);
        assert_eq!(config.timeouts.call_secs, 30);
        assert_eq!(config.host.idle_timeout_minutes, 30);
    }

    #[test]
    fn test_partial_override() {
        let config: Config = toml::from_str(
            r#"
[defaults]
interval_ms = 25

[host]
idle_timeout_minutes = 5
"#,
        )
        .unwrap();
        assert_eq!(config.defaults.interval_ms, 25);
        assert_eq!(config.defaults.wait_timeout_secs, 10);
        assert_eq!(config.host.idle_timeout_minutes, 5);
    }
}
