//! Configuration for the connection manager and individual subscriptions
//!
//! `ManagerConfig` covers per-instance settings (subscription ceiling, monitor
//! cadence); `SubscriptionConfig` is supplied by the caller per subscription and
//! merges defaults for every omitted field.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Per-manager configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManagerConfig {
    /// Hard ceiling on concurrently live subscriptions
    #[serde(default = "default_max_channels")]
    pub max_channels: usize,
    /// Heartbeat monitor cadence in milliseconds (default: 30000 = 30 seconds)
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Staleness threshold for foreground rechecks in milliseconds
    /// (default: 300000 = 5 minutes)
    #[serde(default = "default_staleness_threshold_ms")]
    pub staleness_threshold_ms: u64,
}

fn default_max_channels() -> usize {
    100
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000 // 30 seconds
}

fn default_staleness_threshold_ms() -> u64 {
    300_000 // 5 minutes
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_channels: default_max_channels(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            staleness_threshold_ms: default_staleness_threshold_ms(),
        }
    }
}

impl ManagerConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ManagerConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_channels == 0 {
            return Err(ConfigError::Validation(
                "max_channels must be greater than zero".to_string(),
            ));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "heartbeat_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.staleness_threshold_ms == 0 {
            return Err(ConfigError::Validation(
                "staleness_threshold_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_millis(self.staleness_threshold_ms)
    }
}

/// Kind of change a subscription listens for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Every change on the resource
    #[default]
    #[serde(rename = "*")]
    All,
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::All => write!(f, "*"),
            ChangeKind::Insert => write!(f, "insert"),
            ChangeKind::Update => write!(f, "update"),
            ChangeKind::Delete => write!(f, "delete"),
        }
    }
}

/// Per-subscription configuration, immutable once subscribed
///
/// Every field except `resource` has a default, so callers typically write
/// `SubscriptionConfig { retry_attempts: 5, ..SubscriptionConfig::new("orders") }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionConfig {
    /// Target resource (table/collection) to watch
    pub resource: String,
    /// Schema namespace the resource lives in
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Which change kinds to receive
    #[serde(default)]
    pub events: ChangeKind,
    /// Optional server-side predicate expression (e.g. `id=eq.42`)
    #[serde(default)]
    pub predicate: Option<String>,
    /// Maximum reconnect attempts before the subscription is abandoned
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Base delay for exponential reconnect backoff in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Heartbeat interval hint in milliseconds; the monitor cadence itself is
    /// per-manager (`ManagerConfig::heartbeat_interval_ms`)
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Whether foreground staleness rechecks may reconnect this subscription
    #[serde(default = "default_resilience")]
    pub resilience: bool,
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_resilience() -> bool {
    true
}

impl SubscriptionConfig {
    /// Configuration for `resource` with every other field defaulted
    pub fn new<S: Into<String>>(resource: S) -> Self {
        Self {
            resource: resource.into(),
            schema: default_schema(),
            events: ChangeKind::All,
            predicate: None,
            retry_attempts: default_retry_attempts(),
            base_delay_ms: default_base_delay_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            resilience: default_resilience(),
        }
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}
