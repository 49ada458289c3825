//! Launcher configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via TVCTL_CONFIG or --config)
//! 3. Environment variables

use crate::server::ServerConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tvctl_protocol::{BROADCAST_PORT_OFFSET, DEFAULT_PORT};

/// Default subscriber channel capacity per appliance.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Configuration for a set of appliances sharing one host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host every appliance binds to.
    pub host: String,
    /// Command port of the first appliance; later appliances count up from here.
    pub base_port: u16,
    /// Distance between each command port and its broadcast port.
    pub broadcast_offset: u16,
    /// Notifications buffered per slow subscriber before it starts missing them.
    pub broadcast_capacity: usize,
    /// Appliances to run.
    pub appliances: Vec<ApplianceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            base_port: DEFAULT_PORT,
            broadcast_offset: BROADCAST_PORT_OFFSET,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            appliances: vec![
                ApplianceConfig::new("Master bedroom", 6),
                ApplianceConfig::new("Living room", 4),
                ApplianceConfig::new("Kitchen", 2),
            ],
        }
    }
}

/// One appliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplianceConfig {
    /// Display name, unique within the configuration.
    pub name: String,
    /// Session worker pool size.
    pub workers: usize,
    /// Explicit command port; defaults to `base_port + index`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Explicit broadcast port; defaults to the command port plus the offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast_port: Option<u16>,
}

impl ApplianceConfig {
    pub fn new(name: impl Into<String>, workers: usize) -> Self {
        Self {
            name: name.into(),
            workers,
            port: None,
            broadcast_port: None,
        }
    }
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("TVCTL_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("TVCTL_HOST") {
            if !host.is_empty() {
                self.host = host;
            }
        }

        if let Ok(port) = std::env::var("TVCTL_BASE_PORT") {
            match port.parse() {
                Ok(p) => self.base_port = p,
                Err(_) => tracing::warn!("Ignoring invalid TVCTL_BASE_PORT: {}", port),
            }
        }

        if let Ok(offset) = std::env::var("TVCTL_BROADCAST_OFFSET") {
            match offset.parse() {
                Ok(o) => self.broadcast_offset = o,
                Err(_) => tracing::warn!("Ignoring invalid TVCTL_BROADCAST_OFFSET: {}", offset),
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.appliances.is_empty() {
            return Err(ConfigError::Validation(
                "at least one appliance must be configured".to_string(),
            ));
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::Validation(
                "broadcast_capacity must be greater than zero".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for (index, appliance) in self.appliances.iter().enumerate() {
            if appliance.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "appliance #{} has an empty name",
                    index + 1
                )));
            }
            if appliance.workers == 0 {
                return Err(ConfigError::Validation(format!(
                    "appliance '{}' needs at least one worker",
                    appliance.name
                )));
            }
            if !names.insert(appliance.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate appliance name '{}'",
                    appliance.name
                )));
            }
            if self.command_port(index).is_none() {
                return Err(ConfigError::Validation(format!(
                    "appliance '{}' has no valid command port",
                    appliance.name
                )));
            }
        }

        Ok(())
    }

    /// Returns the command port of the appliance at `index`.
    pub fn command_port(&self, index: usize) -> Option<u16> {
        let appliance = self.appliances.get(index)?;
        match appliance.port {
            Some(port) => Some(port),
            None => u16::try_from(index)
                .ok()
                .and_then(|i| self.base_port.checked_add(i)),
        }
    }

    /// Returns the broadcast port of the appliance at `index`, if it can be
    /// known before binding.
    pub fn broadcast_port(&self, index: usize) -> Option<u16> {
        let appliance = self.appliances.get(index)?;
        match appliance.broadcast_port {
            Some(port) => Some(port),
            None => self.command_port(index)?.checked_add(self.broadcast_offset),
        }
    }

    /// Builds one server configuration per appliance.
    pub fn server_configs(&self) -> Vec<ServerConfig> {
        self.appliances
            .iter()
            .enumerate()
            .filter_map(|(index, appliance)| {
                let port = self.command_port(index)?;
                let mut config = ServerConfig::new(self.host.clone(), port, appliance.workers)
                    .with_name(appliance.name.clone())
                    .with_broadcast_offset(self.broadcast_offset)
                    .with_broadcast_capacity(self.broadcast_capacity);
                if let Some(broadcast_port) = appliance.broadcast_port {
                    config = config.with_broadcast_port(broadcast_port);
                }
                Some(config)
            })
            .collect()
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file '{}': {1}", .0.display())]
    Parse(PathBuf, #[source] serde_yaml::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}
