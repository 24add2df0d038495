//! Broker configuration

use serde::{Deserialize, Serialize};

/// Relay broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Channel buffer size for dispatcher requests
    #[serde(rename = "channel-buffer")]
    pub channel_buffer: usize,

    /// This app's identity, attached to outbound capability announcements and
    /// augmented default-action records
    #[serde(rename = "package-name")]
    pub package_name: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 64,
            package_name: "com.drawbridge.shell".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrokerConfig::default();
        assert_eq!(config.channel_buffer, 64);
        assert_eq!(config.package_name, "com.drawbridge.shell");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: BrokerConfig = serde_yaml::from_str("package-name: com.example.app\n").unwrap();
        assert_eq!(config.package_name, "com.example.app");
        assert_eq!(config.channel_buffer, 64);
    }
}
