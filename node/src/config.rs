//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use agora_types::{Address, GovernanceParams, Token, TokenAmount};

use crate::NodeError;

/// Where governance state is kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Ephemeral in-process storage; everything is lost on exit.
    Memory,
    /// Durable LMDB environment under `data_dir`.
    #[default]
    Lmdb,
}

/// Base parameter set that `[params]` overrides are applied to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamsPreset {
    Mainnet,
    #[default]
    Devnet,
}

/// `[params]` section. Unset fields come from the preset.
///
/// Amounts are plain integers here because TOML has no 128-bit integers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamsConfig {
    pub preset: ParamsPreset,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_stake: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal_deposit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voting_delay_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voting_period_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timelock_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quorum_pct: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_pct: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_tokens: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_title_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_description_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_actions: Option<usize>,
}

impl ParamsConfig {
    /// Apply the overrides to the preset and validate the result.
    pub fn resolve(&self) -> Result<GovernanceParams, NodeError> {
        let mut params = match self.preset {
            ParamsPreset::Mainnet => GovernanceParams::mainnet_defaults(),
            ParamsPreset::Devnet => GovernanceParams::devnet_defaults(),
        };
        if let Some(v) = self.min_stake {
            params.min_stake = TokenAmount::new(v.into());
        }
        if let Some(v) = self.proposal_deposit {
            params.proposal_deposit = TokenAmount::new(v.into());
        }
        if let Some(v) = self.voting_delay_secs {
            params.voting_delay_secs = v;
        }
        if let Some(v) = self.voting_period_secs {
            params.voting_period_secs = v;
        }
        if let Some(v) = self.timelock_secs {
            params.timelock_secs = v;
        }
        if let Some(v) = self.quorum_pct {
            params.quorum_pct = v;
        }
        if let Some(v) = self.threshold_pct {
            params.threshold_pct = v;
        }
        if let Some(ref symbols) = self.supported_tokens {
            params.supported_tokens = symbols
                .iter()
                .map(|s| Token::parse(s))
                .collect::<Result<_, _>>()
                .map_err(|e| NodeError::Config(e.to_string()))?;
        }
        if let Some(v) = self.max_title_len {
            params.max_title_len = v;
        }
        if let Some(v) = self.max_description_len {
            params.max_description_len = v;
        }
        if let Some(v) = self.max_actions {
            params.max_actions = v;
        }
        params
            .validate()
            .map_err(|e| NodeError::Config(e.to_string()))?;
        Ok(params)
    }
}

/// One `[[holders]]` entry seeding the static balance provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderConfig {
    pub address: String,
    pub balance: u64,
}

/// Configuration for an Agora governance node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for LMDB storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Storage backend: "memory" or "lmdb".
    #[serde(default)]
    pub storage: StorageBackend,

    /// Seconds between governance ticks.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Deadline for a single balance-provider query, in milliseconds.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to collect Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,

    /// Reported token supply; defaults to the sum of all holders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_supply: Option<u64>,

    /// Governance parameters.
    #[serde(default)]
    pub params: ParamsConfig,

    /// Token holders known to the built-in balance provider.
    #[serde(default)]
    pub holders: Vec<HolderConfig>,
}

/// File name of the metrics export inside `data_dir`.
pub const METRICS_FILE: &str = "metrics.prom";

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./agora_data")
}

fn default_tick_interval_secs() -> u64 {
    10
}

fn default_provider_timeout_ms() -> u64 {
    2_000
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Check the values serde cannot.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.tick_interval_secs == 0 {
            return Err(NodeError::Config("tick_interval_secs must be positive".into()));
        }
        if self.provider_timeout_ms == 0 {
            return Err(NodeError::Config("provider_timeout_ms must be positive".into()));
        }
        if !matches!(self.log_format.as_str(), "human" | "json") {
            return Err(NodeError::Config(format!(
                "unknown log_format {:?}, expected \"human\" or \"json\"",
                self.log_format
            )));
        }
        for holder in &self.holders {
            Address::parse(&holder.address).map_err(|e| NodeError::Config(e.to_string()))?;
        }
        self.params.resolve()?;
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    /// Where the node exports Prometheus text when metrics are enabled.
    pub fn metrics_path(&self) -> PathBuf {
        self.data_dir.join(METRICS_FILE)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage: StorageBackend::default(),
            tick_interval_secs: default_tick_interval_secs(),
            provider_timeout_ms: default_provider_timeout_ms(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
            total_supply: None,
            params: ParamsConfig::default(),
            holders: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let mut config = NodeConfig::default();
        config.holders.push(HolderConfig {
            address: "0xalice".into(),
            balance: 500,
        });
        config.params.quorum_pct = Some(20);
        let toml_str = config.to_toml_string().expect("serializable");
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.tick_interval_secs, config.tick_interval_secs);
        assert_eq!(parsed.holders, config.holders);
        assert_eq!(parsed.params, config.params);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.tick_interval_secs, 10);
        assert_eq!(config.storage, StorageBackend::Lmdb);
        assert_eq!(config.log_format, "human");
        assert_eq!(
            config.params.resolve().unwrap(),
            GovernanceParams::devnet_defaults()
        );
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            storage = "memory"
            tick_interval_secs = 2

            [params]
            preset = "mainnet"
            quorum_pct = 25
            supported_tokens = ["eth", "dao"]

            [[holders]]
            address = "0xalice"
            balance = 1000

            [[holders]]
            address = "0xbob"
            balance = 250
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.holders.len(), 2);
        config.validate().unwrap();

        let params = config.params.resolve().unwrap();
        assert_eq!(params.quorum_pct, 25);
        assert_eq!(params.voting_period_secs, GovernanceParams::mainnet_defaults().voting_period_secs);
        assert_eq!(params.supported_tokens, vec![Token::new("ETH"), Token::new("DAO")]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config = NodeConfig::from_toml_str("tick_interval_secs = 0").unwrap();
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));

        let config = NodeConfig::from_toml_str("[params]\nquorum_pct = 0").unwrap();
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));

        let config = NodeConfig::from_toml_str("log_format = \"xml\"").unwrap();
        assert!(config.validate().is_err());

        let config =
            NodeConfig::from_toml_str("[[holders]]\naddress = \"has space\"\nbalance = 1").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_storage_fails_to_parse() {
        assert!(NodeConfig::from_toml_str("storage = \"postgres\"").is_err());
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/agora.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
