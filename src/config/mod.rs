//! Configuration management
//!
//! Loads and saves configuration from XDG-compliant paths.
//! Config location: ~/.config/fatum/config.toml

pub mod defaults;

use crate::constants::api::{RANDONAUTICA_URL, TOKEN_ENV_VAR};
use crate::error::{Error, Result};
use crate::profile::{EntropySource, ProfileDefaults, ProfileStore, Radius};
use defaults::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Values new profiles start with
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Point API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Profile store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Values new profiles start with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default search radius in meters
    #[serde(default = "default_radius")]
    pub radius: u32,

    /// Default entropy source
    #[serde(default = "default_source")]
    pub source: String,
}

/// Point API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the point API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token
    #[serde(default)]
    pub token: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Profile store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store file path; empty means the XDG data directory
    #[serde(default)]
    pub path: String,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

// Default value functions for serde
fn default_radius() -> u32 {
    DEFAULT_RADIUS
}
fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}
fn default_base_url() -> String {
    RANDONAUTICA_URL.to_string()
}
fn default_timeout() -> u64 {
    DEFAULT_API_TIMEOUT_SECS
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            source: default_source(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path
    ///
    /// Creates default config if file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read config file: {}", e))
            })?;

            let config: Config = toml::from_str(&content).map_err(|e| {
                Error::Config(format!("Failed to parse config file: {}", e))
            })?;
            config.validate()?;
            Ok(config)
        } else {
            // Create default config
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            Error::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content).map_err(|e| {
            Error::Config(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Check values that have a restricted range
    pub fn validate(&self) -> Result<()> {
        self.profile_defaults()?;
        if self.api.timeout_secs == 0 {
            return Err(Error::Config("api.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Defaults for newly created profiles
    pub fn profile_defaults(&self) -> Result<ProfileDefaults> {
        let radius = Radius::new(self.defaults.radius)
            .map_err(|e| Error::Config(format!("defaults.radius: {}", e)))?;
        let source: EntropySource = self
            .defaults
            .source
            .parse()
            .map_err(|e| Error::Config(format!("defaults.source: {}", e)))?;
        Ok(ProfileDefaults { radius, source })
    }

    /// API token, preferring the environment over the config file
    ///
    /// Returns `None` when neither holds a non-empty token.
    pub fn api_token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| Some(self.api.token.clone()).filter(|t| !t.trim().is_empty()))
    }

    /// Resolved profile store path
    pub fn store_path(&self) -> Result<PathBuf> {
        if self.store.path.trim().is_empty() {
            ProfileStore::default_path()
        } else {
            Ok(PathBuf::from(&self.store.path))
        }
    }

    /// Get a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns the value as a string, or None if not found
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["defaults", "radius"] => Some(self.defaults.radius.to_string()),
            ["defaults", "source"] => Some(self.defaults.source.clone()),

            ["api", "base_url"] => Some(self.api.base_url.clone()),
            ["api", "token"] => Some(self.api.token.clone()),
            ["api", "timeout_secs"] => Some(self.api.timeout_secs.to_string()),

            ["store", "path"] => Some(self.store.path.clone()),

            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "port"] => Some(self.server.port.to_string()),

            _ => None,
        }
    }

    /// Set a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns error if key is invalid or value type is wrong
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["defaults", "radius"] => {
                let radius: u32 = value.parse().map_err(|_| {
                    Error::Config(format!("Invalid radius value: {}", value))
                })?;
                Radius::new(radius).map_err(|e| Error::Config(e.to_string()))?;
                self.defaults.radius = radius;
            }
            ["defaults", "source"] => {
                let source: EntropySource =
                    value.parse().map_err(|e: Error| Error::Config(e.to_string()))?;
                self.defaults.source = source.to_string();
            }

            ["api", "base_url"] => {
                self.api.base_url = value.to_string();
            }
            ["api", "token"] => {
                self.api.token = value.to_string();
            }
            ["api", "timeout_secs"] => {
                let timeout: u64 = value.parse().map_err(|_| {
                    Error::Config(format!("Invalid timeout value: {}", value))
                })?;
                if timeout == 0 {
                    return Err(Error::Config("Timeout must be positive".to_string()));
                }
                self.api.timeout_secs = timeout;
            }

            ["store", "path"] => {
                self.store.path = value.to_string();
            }

            ["server", "host"] => {
                self.server.host = value.to_string();
            }
            ["server", "port"] => {
                self.server.port = value.parse().map_err(|_| {
                    Error::Config(format!("Invalid port value: {}", value))
                })?;
            }

            _ => {
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        Ok(())
    }

    /// List all available config keys
    pub fn available_keys() -> Vec<&'static str> {
        vec![
            "defaults.radius",
            "defaults.source",
            "api.base_url",
            "api.token",
            "api.timeout_secs",
            "store.path",
            "server.host",
            "server.port",
        ]
    }

    /// Get server address as "host:port"
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
