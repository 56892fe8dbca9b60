//! Configuration module for the Atoll store node
//!
//! Supports YAML configuration files with module-based organization

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::services::NodeRole;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Node configuration
    pub node: NodeConfig,
    /// Storage configuration
    pub storage: StorageConfig,
    /// Server configuration
    pub server: ServerConfig,
    /// Logging configuration
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to YAML file
    pub fn to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let yaml =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        std::fs::write(path, yaml).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Merge with another config (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        self.node.merge(other.node);
        self.storage.merge(other.storage);
        self.server.merge(other.server);
        self.log.merge(other.log);
    }
}

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Store ID, as registered with the coordinator
    pub store_id: u64,
    /// Node role: "store" or "index"
    #[serde(default = "default_role")]
    pub role: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            store_id: 1,
            role: default_role(),
        }
    }
}

impl NodeConfig {
    fn merge(&mut self, other: Self) {
        if other.store_id > 0 {
            self.store_id = other.store_id;
        }
        if !other.role.is_empty() {
            self.role = other.role;
        }
    }

    /// Parse the role string; unknown values fall back to store.
    pub fn node_role(&self) -> NodeRole {
        match self.role.as_str() {
            "index" => NodeRole::Index,
            _ => NodeRole::Store,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data storage directory
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl StorageConfig {
    fn merge(&mut self, other: Self) {
        if !other.data_dir.as_os_str().is_empty() {
            self.data_dir = other.data_dir;
        }
    }

    /// Directory of the node-local meta store
    pub fn meta_dir(&self) -> PathBuf {
        self.data_dir.join("meta")
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Coordinator address heartbeats report to
    #[serde(default)]
    pub coordinator_addr: String,
    /// Periodic heartbeat interval in seconds
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            coordinator_addr: String::new(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
        }
    }
}

impl ServerConfig {
    fn merge(&mut self, other: Self) {
        if !other.coordinator_addr.is_empty() {
            self.coordinator_addr = other.coordinator_addr;
        }
        if other.heartbeat_interval_secs > 0 {
            self.heartbeat_interval_secs = other.heartbeat_interval_secs;
        }
    }

    /// Get heartbeat interval as Duration
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LogConfig {
    fn merge(&mut self, other: Self) {
        if !other.level.is_empty() {
            self.level = other.level;
        }
    }
}

// Default value functions

fn default_role() -> String {
    "store".to_string()
}

fn default_heartbeat_interval_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Serialize error: {0}")]
    SerializeError(String),
}
