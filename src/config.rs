use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::{Error, Result};

/// Startup configuration, read once. A missing file or missing
/// `[controller]` settings are fatal; the process must not proceed to
/// scheduling without them.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub controller: ControllerConfig,
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    pub host: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_persist_interval")]
    pub persist_interval_secs: u64,
    /// Accepted for compatibility with solar-less installations; the sync
    /// core carries it through without enforcing it.
    #[serde(default)]
    pub ignore_solar: bool,
    pub message_log: Option<String>,
}

fn default_poll_interval() -> u64 {
    20
}

fn default_persist_interval() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            persist_interval_secs: default_persist_interval(),
            ignore_solar: false,
            message_log: None,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))
    }
}
