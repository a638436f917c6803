//! Configuration file management.

use std::path::PathBuf;

use cashnode_dsproof::StorageParams;
use cashnode_respend::{RelayLimits, RespentFilter};
use serde::{Deserialize, Serialize};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Double-spend proof settings.
    #[serde(default)]
    pub dsproof: DsproofConfig,
    /// Respend detection and relay settings.
    #[serde(default)]
    pub respend: RespendConfig,
    /// Network settings.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Double-spend proof configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DsproofConfig {
    /// Accept, create and relay double-spend proofs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Unresolved orphan proofs older than this are dropped.
    #[serde(default = "default_orphan_expiry")]
    pub orphan_expiry_secs: u64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
    /// Delay before the first cleanup pass.
    #[serde(default = "default_initial_cleanup_delay")]
    pub initial_cleanup_delay_secs: u64,
    /// Misbehavior points for the sender of an expired orphan.
    #[serde(default = "default_orphan_penalty")]
    pub orphan_penalty: u32,
    /// Misbehavior points for the sender of an orphan found invalid.
    #[serde(default = "default_invalid_orphan_penalty")]
    pub invalid_orphan_penalty: u32,
    /// Misbehavior points for sending an invalid or malformed proof.
    #[serde(default = "default_invalid_proof_penalty")]
    pub invalid_proof_penalty: u32,
    #[serde(default = "default_recent_rejects_capacity")]
    pub recent_rejects_capacity: u32,
    #[serde(default = "default_recent_rejects_fp_rate")]
    pub recent_rejects_fp_rate: f64,
}

/// Respend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespendConfig {
    /// Respend relay budget, thousands of bytes per minute.
    #[serde(default = "default_limit_relay")]
    pub limit_relay_kb_per_min: u64,
    #[serde(default = "default_respent_filter_capacity")]
    pub respent_filter_capacity: u32,
    #[serde(default = "default_respent_filter_fp_rate")]
    pub respent_filter_fp_rate: f64,
    /// Log a line for every respend seen.
    #[serde(default = "default_true")]
    pub log_respends: bool,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Relay transactions and proofs to peers.
    #[serde(default = "default_true")]
    pub relay_txes: bool,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log file path. Empty = stderr.
    #[serde(default)]
    pub log_file: String,
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_orphan_expiry() -> u64 {
    90
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_initial_cleanup_delay() -> u64 {
    120
}

fn default_orphan_penalty() -> u32 {
    1
}

fn default_invalid_orphan_penalty() -> u32 {
    5
}

fn default_invalid_proof_penalty() -> u32 {
    10
}

fn default_recent_rejects_capacity() -> u32 {
    120_000
}

fn default_recent_rejects_fp_rate() -> f64 {
    0.000001
}

fn default_limit_relay() -> u64 {
    100
}

fn default_respent_filter_capacity() -> u32 {
    RespentFilter::DEFAULT_CAPACITY
}

fn default_respent_filter_fp_rate() -> f64 {
    RespentFilter::DEFAULT_FP_RATE
}

fn default_max_connections() -> u32 {
    125
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DsproofConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            orphan_expiry_secs: default_orphan_expiry(),
            cleanup_interval_secs: default_cleanup_interval(),
            initial_cleanup_delay_secs: default_initial_cleanup_delay(),
            orphan_penalty: default_orphan_penalty(),
            invalid_orphan_penalty: default_invalid_orphan_penalty(),
            invalid_proof_penalty: default_invalid_proof_penalty(),
            recent_rejects_capacity: default_recent_rejects_capacity(),
            recent_rejects_fp_rate: default_recent_rejects_fp_rate(),
        }
    }
}

impl Default for RespendConfig {
    fn default() -> Self {
        Self {
            limit_relay_kb_per_min: default_limit_relay(),
            respent_filter_capacity: default_respent_filter_capacity(),
            respent_filter_fp_rate: default_respent_filter_fp_rate(),
            log_respends: true,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            relay_txes: true,
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: String::new(),
        }
    }
}

impl DsproofConfig {
    pub fn storage_params(&self) -> StorageParams {
        StorageParams {
            orphan_expiry_secs: self.orphan_expiry_secs,
            orphan_penalty: self.orphan_penalty,
            recent_rejects_capacity: self.recent_rejects_capacity,
            recent_rejects_fp_rate: self.recent_rejects_fp_rate,
        }
    }
}

impl RespendConfig {
    pub fn relay_limits(&self) -> RelayLimits {
        RelayLimits {
            limit_relay_kb_per_min: self.limit_relay_kb_per_min,
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var("CASHNODE_DATA_DIR") {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".cashnode"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/cashnode"))
    }

    fn config_path() -> PathBuf {
        Self::default().data_dir().join("config.toml")
    }
}
