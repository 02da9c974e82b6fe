//! Configuration loading for the TMH daemon.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default config directory name.
const CONFIG_DIR_NAME: &str = "tmh";

/// Default daemon config file name.
const DAEMON_FILE_NAME: &str = "daemon.toml";

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Path to the measurement executable.
    #[serde(default = "default_executable")]
    pub executable: PathBuf,

    /// Event bus buffer size.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            event_buffer: default_event_buffer(),
            log_level: default_log_level(),
        }
    }
}

fn default_executable() -> PathBuf {
    PathBuf::from("/usr/bin/iperf")
}

fn default_event_buffer() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Get the configuration directory path.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "tmh", CONFIG_DIR_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Load daemon configuration from file, falling back to defaults when the
/// file does not exist.
pub fn load(path: Option<&Path>) -> Result<DaemonConfig> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let dir = config_dir().context("could not determine config directory")?;
            dir.join(DAEMON_FILE_NAME)
        }
    };

    if !config_path.exists() {
        debug!("Daemon config not found at {:?}, using defaults", config_path);
        return Ok(DaemonConfig::default());
    }

    info!("Loading daemon config from {:?}", config_path);
    let contents = std::fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read daemon config from {config_path:?}"))?;

    let config: DaemonConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse daemon config from {config_path:?}"))?;

    Ok(config)
}

/// Generate an example daemon.toml configuration.
#[allow(dead_code)] // Used by a future config init command
pub fn example_config() -> String {
    r#"# TMH Daemon Configuration
# Place this file at ~/.config/tmh/daemon.toml

# Path to the measurement executable
executable = "/usr/bin/iperf"

# Event bus buffer size
event_buffer = 256

# Log level: trace, debug, info, warn, error
log_level = "info"
"#
    .to_string()
}
