//! Process configuration for the config-reader binary.
//!
//! Values come from an optional TOML file and are then overridden by environment variables
//! (after `.env` has been loaded by `dotenvy`):
//!
//! | Variable              | Meaning                                  | Default                     |
//! |-----------------------|------------------------------------------|-----------------------------|
//! | `APPLICATION_NAME`    | Application whose records are cached     | required                    |
//! | `DATABASE_URL`        | `SeaORM` connection URL                  | local `SQLite` file         |
//! | `REFRESH_INTERVAL_MS` | Cache refresh period                     | `30000`                     |
//! | `BIND_ADDRESS`        | HTTP listen address                      | `127.0.0.1:8080`            |
//! | `SETTINGS_PATH`       | Local settings file to reconcile         | `settings.toml`             |
//! | `RETAIN_ON_EMPTY`     | Keep snapshot when a reload finds nothing | `false`                    |

use crate::{
    cache::CacheOptions,
    config::database::DEFAULT_DATABASE_URL,
    errors::{Error, Result},
    scheduler::DEFAULT_REFRESH_INTERVAL_MS,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an alternative configuration file.
pub const CONFIG_PATH_VAR: &str = "CONFIG_PATH";

/// Configuration file read when `CONFIG_PATH` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub application_name: String,
    pub database_url: String,
    pub refresh_interval_ms: u64,
    pub bind_address: String,
    pub settings_path: PathBuf,
    pub retain_on_empty: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            application_name: String::new(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            bind_address: "127.0.0.1:8080".to_string(),
            settings_path: PathBuf::from("settings.toml"),
            retain_on_empty: false,
        }
    }
}

impl AppConfig {
    /// Parses a TOML configuration document. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse configuration TOML: {e}"),
        })
    }

    /// Reads a TOML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Attempting to load configuration from: {:?}", path);
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("Failed to read config file {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads the configuration file (if present) and applies environment overrides.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the file cannot be parsed, an environment value is
    /// malformed, or the result fails validation.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var(CONFIG_PATH_VAR).ok();
        let path = PathBuf::from(explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH));

        let base = if path.exists() {
            Self::from_file(&path)?
        } else if explicit.is_some() {
            return Err(Error::Config {
                message: format!("Config file {} does not exist", path.display()),
            });
        } else {
            tracing::debug!("No config file found, using defaults and environment");
            Self::default()
        };

        let config = base.with_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from `lookup`, which maps variable names to values.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("APPLICATION_NAME") {
            self.application_name = value;
        }
        if let Some(value) = lookup("DATABASE_URL") {
            self.database_url = value;
        }
        if let Some(value) = lookup("REFRESH_INTERVAL_MS") {
            self.refresh_interval_ms = value.trim().parse().map_err(|_| Error::Config {
                message: format!("REFRESH_INTERVAL_MS must be a positive integer, got '{value}'"),
            })?;
        }
        if let Some(value) = lookup("BIND_ADDRESS") {
            self.bind_address = value;
        }
        if let Some(value) = lookup("SETTINGS_PATH") {
            self.settings_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("RETAIN_ON_EMPTY") {
            self.retain_on_empty = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => {
                    return Err(Error::Config {
                        message: format!("RETAIN_ON_EMPTY must be a boolean, got '{value}'"),
                    });
                }
            };
        }
        Ok(self)
    }

    /// Checks required values.
    pub fn validate(&self) -> Result<()> {
        if self.application_name.trim().is_empty() {
            return Err(Error::Config {
                message: "APPLICATION_NAME must be set".to_string(),
            });
        }
        if self.refresh_interval_ms == 0 {
            return Err(Error::Config {
                message: "REFRESH_INTERVAL_MS must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    #[must_use]
    pub const fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            retain_on_empty: self.retain_on_empty,
        }
    }
}
