//! Server configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use strictly_ultimate::Strategy;
use tracing::{debug, info, instrument};

/// Configuration for the match server.
///
/// Every field has a default, so an empty file is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind to.
    #[serde(default = "default_port")]
    port: u16,

    /// Clock per side per round in seconds (human vs human only). 0 disables
    /// clocks.
    #[serde(default = "default_time_budget_secs")]
    time_budget_secs: u64,

    /// Interval between clock ticks in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    tick_interval_ms: u64,

    /// Strategy tag used for computer players that do not name one.
    #[serde(default = "default_strategy")]
    default_strategy: String,

    /// Seed for computer players. Random when unset.
    #[serde(default)]
    ai_seed: Option<u64>,

    /// Buffered events per match subscriber.
    #[serde(default = "default_event_capacity")]
    event_capacity: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_time_budget_secs() -> u64 {
    300
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_strategy() -> String {
    "heuristic".to_string()
}

fn default_event_capacity() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            time_budget_secs: default_time_budget_secs(),
            tick_interval_ms: default_tick_interval_ms(),
            default_strategy: default_strategy(),
            ai_seed: None,
            event_capacity: default_event_capacity(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(host = %config.host, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text and validates it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::new(
                "tick_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::new(
                "event_capacity must be greater than 0".to_string(),
            ));
        }
        self.strategy()?;
        Ok(())
    }

    /// Clock per side, or `None` when clocks are disabled.
    pub fn time_budget(&self) -> Option<Duration> {
        (self.time_budget_secs > 0).then(|| Duration::from_secs(self.time_budget_secs))
    }

    /// Interval between clock ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Parsed default strategy.
    pub fn strategy(&self) -> Result<Strategy, ConfigError> {
        self.default_strategy
            .parse()
            .map_err(|e| ConfigError::new(format!("Invalid default_strategy: {}", e)))
    }

    /// Overrides the bind address.
    pub fn with_address(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    /// Overrides the clock budget.
    pub fn with_time_budget_secs(mut self, secs: u64) -> Self {
        self.time_budget_secs = secs;
        self
    }

    /// Overrides the tick interval.
    pub fn with_tick_interval_ms(mut self, millis: u64) -> Self {
        self.tick_interval_ms = millis;
        self
    }

    /// Overrides the strategy of computer players that do not name one.
    pub fn with_default_strategy(mut self, strategy: Strategy) -> Self {
        self.default_strategy = strategy.to_string();
        self
    }

    /// Overrides the computer seed.
    pub fn with_ai_seed(mut self, seed: Option<u64>) -> Self {
        if seed.is_some() {
            self.ai_seed = seed;
        }
        self
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = ServerConfig::from_toml("").expect("valid");
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.time_budget(), Some(Duration::from_secs(300)));
        assert_eq!(config.strategy().expect("strategy"), Strategy::Heuristic);
    }

    #[test]
    fn test_zero_budget_disables_clocks() {
        let config = ServerConfig::from_toml("time_budget_secs = 0").expect("valid");
        assert_eq!(config.time_budget(), None);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = ServerConfig::from_toml("default_strategy = \"clever\"").expect_err("invalid");
        assert!(err.message.contains("default_strategy"));
        assert!(ServerConfig::from_toml("tick_interval_ms = 0").is_err());
        assert!(ServerConfig::from_toml("port = \"eighty\"").is_err());
    }
}
