//! Configuration module
//!
//! Handles loading and saving wallboxctl configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::protocol::{DEFAULT_PORT, DEFAULT_RETRIES};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Wallbox endpoint settings
    #[serde(default)]
    pub device: DeviceConfig,

    /// Client behavior settings
    #[serde(default)]
    pub client: ClientConfig,
}

/// Wallbox endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Wallbox host name or IP address
    pub host: Option<String>,
    /// Wallbox UDP port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_port(),
        }
    }
}

/// Client behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Extra round-trip attempts after a failed one
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("wallboxctl/config.toml")),
            Some(PathBuf::from("./wallboxctl.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                return Self::load(path);
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> String {
    let config = Config {
        device: DeviceConfig {
            host: Some("192.168.178.55".to_string()),
            port: DEFAULT_PORT,
        },
        ..Default::default()
    };

    toml::to_string_pretty(&config).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.device.port, DEFAULT_PORT);
        assert_eq!(config.client.retries, DEFAULT_RETRIES);
        assert!(config.device.host.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let config = Config {
            device: DeviceConfig {
                host: Some("wallbox.local".to_string()),
                port: 7091,
            },
            ..Default::default()
        };
        let file = NamedTempFile::new().unwrap();

        config.save(file.path()).unwrap();

        let loaded = Config::load(file.path()).unwrap();
        assert_eq!(loaded.device.host.as_deref(), Some("wallbox.local"));
        assert_eq!(loaded.device.port, 7091);
    }

    #[test]
    fn test_partial_file_gets_defaults() {
        let config: Config = toml::from_str("[device]\nhost = \"192.168.178.55\"\n").unwrap();
        assert_eq!(config.device.host.as_deref(), Some("192.168.178.55"));
        assert_eq!(config.device.port, DEFAULT_PORT);
        assert_eq!(config.client.retries, DEFAULT_RETRIES);
    }

    #[test]
    fn test_sample_config() {
        let sample = generate_sample_config();
        let parsed: Config = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.device.host.as_deref(), Some("192.168.178.55"));
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = Config::load(Path::new("/nonexistent/wallboxctl.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
