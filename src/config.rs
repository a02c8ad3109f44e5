use std::{fs, path::Path};

use chrono_tz::Tz;
use serde::Deserialize;
use thiserror::Error as ThisError;

/// Environment variable that points at the configuration file.
pub const CONFIG_ENV: &str = "BISTRO_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("Could not read '{path}'.\n{source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Could not deserialize.\n{0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Unknown time zone '{0}'")]
    TimeZone(String),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: String,
    pub bind_address: String,
    /// IANA name of the restaurant's time zone, used for stored timestamps.
    pub timezone: String,
    /// Users granted the admin role on start-up.
    pub admin_users: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "data.db".to_string(),
            bind_address: "127.0.0.1:7878".to_string(),
            timezone: "Europe/London".to_string(),
            admin_users: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_config(config: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(config)?;
        config.timezone()?;
        Ok(config)
    }

    /**
    Load the configuration from `$BISTRO_CONFIG`, or `config.json`.

    A missing `config.json` means defaults. A missing file named by the
    environment variable is an error.
    */
    pub fn load() -> Result<Self, ConfigError> {
        let (path, required) = match std::env::var(CONFIG_ENV) {
            Ok(path) => (path, true),
            Err(_) => (DEFAULT_CONFIG_PATH.to_string(), false),
        };
        if !required && !Path::new(&path).exists() {
            tracing::info!(path = %path, "No configuration file, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path, "Loaded configuration");
        Self::from_config(&contents)
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse()
            .map_err(|_| ConfigError::TimeZone(self.timezone.clone()))
    }
}
