use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PadlinkConfig {
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub web: WebConfig,
}

/// Listen address for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

/// Session garbage-collection policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Seconds between sweeper runs.
    pub sweep_interval_secs: u64,

    /// Minimum age (from creation) before an empty session is swept.
    pub idle_threshold_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 300,
            idle_threshold_secs: 3600,
        }
    }
}

impl RelayConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_secs)
    }
}

/// Static front-end serving.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Directory of front-end files to serve; omit to disable static
    /// serving. `GET /controller` maps to `controller.html` inside it.
    pub static_dir: Option<PathBuf>,
}
