//! Configuration types for the session manager.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::Error;

/// Session manager configuration loaded from YAML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ManagerConfig {
    /// Session settings
    pub session: SessionSettings,
}

impl ManagerConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let config: ManagerConfig =
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> crate::Result<()> {
        if self.session.default_timeout_ms == 0 {
            return Err(Error::Config(
                "session.default_timeout_ms must be > 0".to_string(),
            ));
        }

        if self.session.liveness_margin_factor == 0 {
            return Err(Error::Config(
                "session.liveness_margin_factor must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Session timeout used when a caller does not pass one, in milliseconds
    pub default_timeout_ms: u64,
    /// How many session timeouts the liveness monitor waits for a reconnect
    pub liveness_margin_factor: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_timeout_ms: 90_000,
            liveness_margin_factor: 2,
        }
    }
}

impl SessionSettings {
    /// Default session timeout.
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Grace period the liveness monitor allows a session with `timeout`.
    pub fn liveness_margin(&self, timeout: Duration) -> Duration {
        timeout.saturating_mul(self.liveness_margin_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ManagerConfig::default();
        assert_eq!(config.session.default_timeout_ms, 90_000);
        assert_eq!(config.session.liveness_margin_factor, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_liveness_margin_is_twice_timeout_by_default() {
        let settings = SessionSettings::default();
        assert_eq!(
            settings.liveness_margin(Duration::from_millis(90_000)),
            Duration::from_millis(180_000)
        );
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
session:
  default_timeout_ms: 30000
  liveness_margin_factor: 3
"#;

        let config = ManagerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.session.default_timeout(), Duration::from_secs(30));
        assert_eq!(config.session.liveness_margin_factor, 3);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
session:
  default_timeout_ms: 5000
"#;

        let config = ManagerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.session.default_timeout_ms, 5000);
        assert_eq!(config.session.liveness_margin_factor, 2);
    }

    #[test]
    fn test_invalid_timeout() {
        let mut config = ManagerConfig::default();
        config.session.default_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_margin_factor() {
        let yaml = r#"
session:
  liveness_margin_factor: 0
"#;
        assert!(ManagerConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_malformed_yaml() {
        let result = ManagerConfig::from_yaml("session: [not, a, map]");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = ManagerConfig::from_file("/nonexistent/coord-session.yaml");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
