//! Drawbridge configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::broker::BrokerConfig;

/// Main drawbridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Relay broker configuration
    pub broker: BrokerConfig,

    /// Callback bridge configuration
    pub bridge: BridgeConfig,

    /// Persisted-state configuration
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .drawbridge.yml
        let local_config = PathBuf::from(".drawbridge.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/drawbridge/drawbridge.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("drawbridge").join("drawbridge.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Callback bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Socket path override; the runtime dir is used when unset
    #[serde(rename = "socket-path")]
    pub socket_path: Option<PathBuf>,
}

impl BridgeConfig {
    /// Resolve the effective socket path
    pub fn socket_path(&self) -> PathBuf {
        self.socket_path.clone().unwrap_or_else(crate::bridge::get_socket_path)
    }
}

/// Persisted-state configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the default-action store
    #[serde(rename = "actions-dir")]
    pub actions_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // XDG data directory (~/.local/share/drawbridge on Linux)
        let actions_dir = dirs::data_dir()
            .map(|d| d.join("drawbridge"))
            .unwrap_or_else(|| PathBuf::from(".actionstore"));

        Self { actions_dir }
    }
}
