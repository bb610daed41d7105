// crates/bazaar-daemon/src/config.rs
//
// Runtime configuration for the trust daemon.
// Loaded from a TOML file or populated with sensible defaults.

use std::collections::HashSet;
use std::fs;

use serde::Deserialize;

use bazaar_core::actor::ActorId;
use bazaar_core::error::BazaarError;
use bazaar_reputation::TrustConfig;

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// The current actor's id (hex public key). Crawls are refused without it.
    #[serde(default)]
    pub self_id: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for local data storage (RocksDB score store).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// JSON assertion snapshot exported by the relay layer.
    #[serde(default = "default_assertions_path")]
    pub assertions_path: String,

    /// JSON list of marketplace deal records, if any.
    #[serde(default)]
    pub deals_path: Option<String>,

    /// Externally maintained follow network, trusted as-is.
    #[serde(default)]
    pub follow_network: Vec<String>,

    /// Overrides the bundled curated seed list when set.
    #[serde(default)]
    pub seeds: Option<Vec<String>>,

    /// Seconds between staleness re-crawls.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    #[serde(default)]
    pub trust: TrustConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> String {
    "~/.bazaar/data".to_string()
}

fn default_assertions_path() -> String {
    "~/.bazaar/assertions.json".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    900
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            self_id: None,
            log_level: default_log_level(),
            data_dir: default_data_dir(),
            assertions_path: default_assertions_path(),
            deals_path: None,
            follow_network: Vec::new(),
            seeds: None,
            refresh_interval_secs: default_refresh_interval_secs(),
            trust: TrustConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Parsed `self_id`. A present-but-blank id is a configuration error.
    pub fn self_actor(&self) -> Result<Option<ActorId>, BazaarError> {
        self.self_id.as_deref().map(|raw| ActorId::parse(raw)).transpose()
    }

    /// Parsed follow network; blank entries are skipped.
    pub fn follow_network_ids(&self) -> HashSet<ActorId> {
        self.follow_network
            .iter()
            .filter_map(|raw| ActorId::parse(raw.as_str()).ok())
            .collect()
    }
}
