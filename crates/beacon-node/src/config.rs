use std::path::PathBuf;

use beacon_core::ProtocolConfig;
use serde::{Deserialize, Serialize};

/// Node configuration, TOML-loadable the way `luxtensor-node::config::Config`
/// is, trimmed to the sections this demo binary actually uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub protocol: ProtocolConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,
    /// How many layers make up one epoch.
    pub layers_per_epoch: u64,
    /// Epochs `1..=genesis_epochs` skip the protocol and return the fixed
    /// genesis beacon (spec.md §4.7).
    pub genesis_epochs: u32,
    /// Wall-clock duration of one simulated layer tick, driving the demo
    /// `IntervalLayerClock`.
    pub layer_duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to a RocksDB beacon mirror. Unset runs in-memory only.
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig {
                name: "beacon-node".to_string(),
                layers_per_epoch: 5,
                genesis_epochs: 2,
                layer_duration_ms: 1_000,
            },
            protocol: ProtocolConfig::default(),
            storage: StorageConfig { db_path: Some(PathBuf::from("./data/beacons")) },
            logging: LoggingConfig { level: "info".to_string() },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.node.name, config.node.name);
    }
}
