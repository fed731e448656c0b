//! Application configuration, loaded once at startup and passed by value.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::mqtt::config::BrokerConfig;
use crate::APP_NAME;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file <{path}>: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Which scheduling model the dispatch loop runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// One thread round-robins broker poll, interface step and publishing.
    #[default]
    Cooperative,
    /// Broker I/O, interface and publisher run on independent tasks.
    Threaded,
}

/// The `[gateway]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub mode: RunMode,
    /// Topic root used when no map file is given.
    pub root: String,
    /// Subscription patterns used when no map file is given.
    pub topics: Vec<String>,
    /// Optional JSON map file enabling keyword translation.
    pub map_file: Option<PathBuf>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub broker: BrokerConfig,
    pub gateway: GatewayConfig,
    /// Free-form parameters handed verbatim to the interface adapter.
    pub interface: HashMap<String, String>,
}

impl Config {
    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads the configuration.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// tried and a missing file there degrades to built-in defaults so a
    /// fresh installation can still start.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_owned(),
                    source,
                })?;
                info!("Configuration loaded from {}", path.display());
                Self::from_toml(&text)
            }
            None => {
                let default = Self::default_path();
                match fs::read_to_string(&default) {
                    Ok(text) => {
                        info!("Configuration loaded from {}", default.display());
                        Self::from_toml(&text)
                    }
                    Err(err) => {
                        debug!(
                            "No configuration at {} ({}), using defaults",
                            default.display(),
                            err
                        );
                        Ok(Self::default())
                    }
                }
            }
        }
    }

    /// Default configuration file location inside the user config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME)
            .join(format!("{APP_NAME}.toml"))
    }
}
