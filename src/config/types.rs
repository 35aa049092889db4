//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::limits::LimitsConfig;
use super::listen::ListenConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server information.
    #[serde(default)]
    pub server: ServerConfig,
    /// Network listen configuration.
    pub listen: ListenConfig,
    /// Queue and input limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name, used in logs.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Prometheus metrics HTTP port (default: 9090, 0 disables).
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    /// Connection timeouts.
    #[serde(default)]
    pub idle_timeouts: IdleTimeoutsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            metrics_port: default_metrics_port(),
            idle_timeouts: IdleTimeoutsConfig::default(),
        }
    }
}

fn default_server_name() -> String {
    "courier.local".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

/// Idle timeout configuration for client connections.
///
/// - `registration`: Seconds allowed to send `server:register` (default: 60)
/// - `idle`: Seconds a registered session may stay silent (default: 0)
///
/// A value of 0 disables the corresponding timeout.
#[derive(Debug, Clone, Deserialize)]
pub struct IdleTimeoutsConfig {
    /// Seconds allowed for registration before disconnect (default: 60).
    #[serde(default = "default_registration_timeout")]
    pub registration: u64,

    /// Seconds of silence before a registered session is closed (default: 0, disabled).
    #[serde(default)]
    pub idle: u64,
}

impl Default for IdleTimeoutsConfig {
    fn default() -> Self {
        Self {
            registration: default_registration_timeout(),
            idle: 0,
        }
    }
}

fn default_registration_timeout() -> u64 {
    60
}
