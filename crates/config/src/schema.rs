//! Config schema for the relaybot process.

use serde::{Deserialize, Serialize};

/// Root of `relaybot.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaybotConfig {
    /// Telegram bot settings. Deserialized by the telegram crate.
    pub telegram: serde_json::Value,
    pub relay: RelayConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

/// Pipeline timing and first-start seed values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RelayConfig {
    /// Quiet period after the last item before a burst is flushed.
    pub quiet_period_ms: u64,
    /// Delay between consecutive relay calls in a batch.
    pub pacing_ms: u64,
    /// Destination written to the settings store when it has none yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Caption suffix written to the settings store when it has none yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_suffix: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: 2000,
            pacing_ms: 2500,
            channel_id: None,
            caption_suffix: None,
        }
    }
}

/// Liveness HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file. Defaults to `relaybot.db` in the data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<std::path::PathBuf>,
}
