use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub latency: LatencyConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// API server address
    pub address: String,
    /// API server port
    pub port: u16,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// In-memory store configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Directory holding `workers.json`, `cameras.json` and `violations.json`.
    /// The built-in fixtures are used when unset.
    #[serde(default)]
    pub fixtures_dir: Option<PathBuf>,
}

/// Simulated latency applied to every data-layer operation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LatencyConfig {
    /// Whether delays are applied at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_list_ms")]
    pub list_ms: u64,
    #[serde(default = "default_get_ms")]
    pub get_ms: u64,
    #[serde(default = "default_create_ms")]
    pub create_ms: u64,
    #[serde(default = "default_update_ms")]
    pub update_ms: u64,
    #[serde(default = "default_delete_ms")]
    pub delete_ms: u64,
    /// Upper bound of uniform random jitter added on top of each delay
    #[serde(default)]
    pub jitter_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_list_ms() -> u64 {
    300
}

fn default_get_ms() -> u64 {
    200
}

fn default_create_ms() -> u64 {
    300
}

fn default_update_ms() -> u64 {
    250
}

fn default_delete_ms() -> u64 {
    200
}

/// Live monitor configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// Interval between polls in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Pending violations younger than this raise an active alert
    #[serde(default = "default_alert_window")]
    pub alert_window_secs: i64,
    /// Violations younger than this are drawn as live detections
    #[serde(default = "default_detection_window")]
    pub detection_window_secs: i64,
    /// Capacity of the in-process event bus
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_alert_window() -> i64 {
    30
}

fn default_detection_window() -> i64 {
    60
}

fn default_event_buffer() -> usize {
    256
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 4750,
            log_level: default_log_level(),
        }
    }
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            list_ms: default_list_ms(),
            get_ms: default_get_ms(),
            create_ms: default_create_ms(),
            update_ms: default_update_ms(),
            delete_ms: default_delete_ms(),
            jitter_ms: 0,
        }
    }
}

impl LatencyConfig {
    /// Latency profile with every delay switched off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            alert_window_secs: default_alert_window(),
            detection_window_secs: default_detection_window(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Longest alert or detection window accepted, one week
pub const MAX_WINDOW_SECS: i64 = 7 * 24 * 60 * 60;

impl MonitorConfig {
    pub fn validate(&self) -> std::result::Result<(), crate::error::Error> {
        for (name, secs) in [
            ("alert_window_secs", self.alert_window_secs),
            ("detection_window_secs", self.detection_window_secs),
        ] {
            if !(1..=MAX_WINDOW_SECS).contains(&secs) {
                return Err(crate::error::Error::Config(format!(
                    "monitor.{} must be between 1 and {}, got {}",
                    name, MAX_WINDOW_SECS, secs
                )));
            }
        }
        Ok(())
    }
}

/// Load configuration from a file or use default
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => {
            let config_str = std::fs::read_to_string(path)
                .context(format!("Failed to read config file: {:?}", path))?;

            let config: Config = if path.extension().map_or(false, |ext| ext == "json") {
                serde_json::from_str(&config_str).context("Failed to parse JSON config")?
            } else if path.extension().map_or(false, |ext| ext == "toml") {
                toml::from_str(&config_str).context("Failed to parse TOML config")?
            } else {
                return Err(crate::error::Error::Config(format!(
                    "Unsupported config file format: {:?}",
                    path
                ))
                .into());
            };

            config.monitor.validate()?;
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            address = "127.0.0.1"
            port = 8080

            [latency]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.api.port, 8080);
        assert_eq!(config.api.log_level, "info");
        assert!(!config.latency.enabled);
        assert_eq!(config.latency.update_ms, 250);
        assert_eq!(config.monitor.poll_interval_secs, 5);
        assert!(config.store.fixtures_dir.is_none());
    }

    #[test]
    fn test_unsupported_extension_is_config_error() {
        let dir = std::env::temp_dir().join(format!("ppe-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(&path, "api: {}").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(
            crate::error::Error::find(&err),
            Some(crate::error::Error::Config(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_out_of_range_monitor_window_is_rejected() {
        let dir = std::env::temp_dir().join(format!("ppe-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[monitor]\nalert_window_secs = 9223372036854775807\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(
            crate::error::Error::find(&err),
            Some(crate::error::Error::Config(_))
        ));
        assert!(MonitorConfig::default().validate().is_ok());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_no_path_gives_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.api.port, 4750);
        assert_eq!(config.latency.list_ms, 300);
    }
}
