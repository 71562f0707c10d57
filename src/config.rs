use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mock::DEFAULT_NETWORK_ID;

/// Runtime settings for the dashboard.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub network_id: String,
    pub fetch_delay_ms: u64,
    pub step_delay_ms: u64,
    pub detail_delay_ms: u64,
    pub autoplay_interval_ms: u64,
    pub export_dir: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            network_id: DEFAULT_NETWORK_ID.to_string(),
            fetch_delay_ms: 300,
            step_delay_ms: 500,
            detail_delay_ms: 200,
            autoplay_interval_ms: 2000,
            export_dir: PathBuf::from("."),
        }
    }
}

impl DashboardConfig {
    /// Reads a JSON config file, or returns the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = fs::read_to_string(path)?;
                serde_json::from_str(&text)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.autoplay_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "autoplay_interval_ms must be greater than zero".into(),
            ));
        }
        if self.network_id.trim().is_empty() {
            return Err(ConfigError::Invalid("network_id must not be empty".into()));
        }
        Ok(())
    }

    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn detail_delay(&self) -> Duration {
        Duration::from_millis(self.detail_delay_ms)
    }

    pub fn autoplay_interval(&self) -> Duration {
        Duration::from_millis(self.autoplay_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: DashboardConfig = serde_json::from_str(r#"{ "step_delay_ms": 50 }"#).unwrap();
        assert_eq!(config.step_delay(), Duration::from_millis(50));
        assert_eq!(config.fetch_delay(), Duration::from_millis(300));
        assert_eq!(config.autoplay_interval(), Duration::from_secs(2));
        assert_eq!(config.network_id, DEFAULT_NETWORK_ID);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = DashboardConfig {
            autoplay_interval_ms: 0,
            ..DashboardConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_without_path_uses_defaults() {
        let config = DashboardConfig::load(None).unwrap();
        assert_eq!(config, DashboardConfig::default());
    }

    #[test]
    fn load_reports_malformed_file() {
        let path = std::env::temp_dir().join(format!(
            "nn-dashboard-config-{}.json",
            std::process::id()
        ));
        fs::write(&path, "{ not json").unwrap();
        let result = DashboardConfig::load(Some(&path));
        let _ = fs::remove_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
