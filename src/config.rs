use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{ExamgateError, Result};
use crate::utils::{get_env_with_prefix, parse_env_with_prefix};

/// Main configuration for an examgate service
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

/// Settings for the background expiry monitor.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// Run the periodic expiry re-check
    #[serde(default = "default_monitor_enabled")]
    pub enabled: bool,

    /// Seconds between re-checks of the local subscription state
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Capacity of the channel carrying pushed subscription updates
    #[serde(default = "default_update_buffer")]
    pub update_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: default_monitor_enabled(),
            poll_interval_secs: default_poll_interval_secs(),
            update_buffer: default_update_buffer(),
        }
    }
}

impl MonitorConfig {
    /// Load monitor configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override only the fields whose environment variables are set.
    pub fn apply_env(&mut self) {
        if let Some(enabled) = get_env_with_prefix("MONITOR_ENABLED") {
            self.enabled = enabled.parse().unwrap_or(true);
        }
        if let Some(secs) = parse_env_with_prefix("MONITOR_POLL_INTERVAL_SECS") {
            self.poll_interval_secs = secs;
        }
        if let Some(buffer) = parse_env_with_prefix("MONITOR_UPDATE_BUFFER") {
            self.update_buffer = buffer;
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

fn default_monitor_enabled() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_update_buffer() -> usize {
    16
}

impl ServerConfig {
    pub fn addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_monitor(mut self, monitor: MonitorConfig) -> Self {
        self.config.monitor = monitor;
        self
    }

    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.monitor.poll_interval_secs = secs;
        self
    }

    /// Load configuration from environment variables with EXAMGATE_ prefix
    pub fn from_env(mut self) -> Self {
        if let Some(host) = get_env_with_prefix("HOST") {
            self.config.server.host = host;
        }
        if let Some(port) = parse_env_with_prefix("PORT") {
            self.config.server.port = port;
        }
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }

        self.config.monitor.apply_env();

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns an error if the server address, log level or monitor settings are invalid.
    pub fn build(self) -> Result<Config> {
        self.config.server.addr().map_err(|e| {
            ExamgateError::bad_request(format!(
                "Invalid server address {}:{} - {}",
                self.config.server.host, self.config.server.port, e
            ))
        })?;

        if self.config.server.port == 0 {
            return Err(ExamgateError::bad_request("Server port must be greater than 0"));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(ExamgateError::bad_request(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        if self.config.monitor.enabled {
            if self.config.monitor.poll_interval_secs == 0 {
                return Err(ExamgateError::bad_request(
                    "Monitor poll_interval_secs must be greater than 0 when enabled",
                ));
            }
            if self.config.monitor.update_buffer == 0 {
                return Err(ExamgateError::bad_request(
                    "Monitor update_buffer must be greater than 0 when enabled",
                ));
            }
        }

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.logging.level, "info");
        assert!(config.monitor.enabled);
        assert_eq!(config.monitor.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.monitor.update_buffer, 16);
    }

    #[test]
    fn test_builder_setters() {
        let config = ConfigBuilder::new()
            .with_host("127.0.0.1")
            .with_port(9090)
            .with_log_level("debug")
            .with_json_logging(true)
            .with_poll_interval_secs(5)
            .build()
            .unwrap();

        assert_eq!(config.server.addr().unwrap().port(), 9090);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.monitor.poll_interval_secs, 5);
    }

    #[test]
    fn test_rejects_invalid_log_level() {
        let result = ConfigBuilder::new().with_log_level("loud").build();
        assert!(matches!(result, Err(ExamgateError::BadRequest(_))));
    }

    #[test]
    fn test_rejects_zero_port() {
        assert!(ConfigBuilder::new().with_port(0).build().is_err());
    }

    #[test]
    fn test_rejects_zero_poll_interval_when_enabled() {
        assert!(ConfigBuilder::new().with_poll_interval_secs(0).build().is_err());

        let disabled = MonitorConfig {
            enabled: false,
            poll_interval_secs: 0,
            update_buffer: 0,
        };
        assert!(ConfigBuilder::new().with_monitor(disabled).build().is_ok());
    }

    #[test]
    fn test_monitor_from_env() {
        unsafe {
            std::env::set_var("EXAMGATE_MONITOR_POLL_INTERVAL_SECS", "15");
            std::env::set_var("EXAMGATE_MONITOR_UPDATE_BUFFER", "not-a-number");
        }
        let monitor = MonitorConfig::from_env();
        let built = ConfigBuilder::new()
            .with_monitor(MonitorConfig {
                enabled: false,
                poll_interval_secs: 5,
                update_buffer: 4,
            })
            .from_env()
            .config;
        unsafe {
            std::env::remove_var("EXAMGATE_MONITOR_POLL_INTERVAL_SECS");
            std::env::remove_var("EXAMGATE_MONITOR_UPDATE_BUFFER");
        }

        assert_eq!(monitor.poll_interval_secs, 15);
        assert_eq!(monitor.update_buffer, 16);

        // Fields without a usable variable keep what the builder set.
        assert_eq!(built.monitor.poll_interval_secs, 15);
        assert_eq!(built.monitor.update_buffer, 4);
        assert!(!built.monitor.enabled);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: Config =
            serde_json::from_str(r#"{"monitor": {"poll_interval_secs": 30}}"#).unwrap();
        assert_eq!(config.monitor.poll_interval_secs, 30);
        assert!(config.monitor.enabled);
        assert_eq!(config.server.port, 8000);
    }
}
