//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `miotac.toml` in the working directory (or the path in
//! `MIOTAC_CONFIG`). Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use miotac_app::services::integration::IntegrationSettings;
use miotac_domain::config_entry::{DEFAULT_RETRIES, EntryData};
use miotac_domain::device::Token;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub polling: PollingConfig,
    /// Units imported as config entries at start-up.
    pub devices: Vec<DeviceConfig>,
    pub simulation: SimulationConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Polling periods.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Seconds between two status reads of a unit.
    pub scan_interval_secs: u64,
    /// Seconds before setting up a unit again after it was not ready.
    pub setup_retry_secs: u64,
}

/// One `[[devices]]` item.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub host: String,
    pub token: String,
    pub name: String,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

/// Simulated units served by the daemon's device connector.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub devices: Vec<SimulatedDeviceConfig>,
}

/// One `[[simulation.devices]]` item.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatedDeviceConfig {
    pub host: String,
    pub token: String,
    pub model: String,
    pub mac: String,
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

impl Config {
    /// Load configuration from `miotac.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// result fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("MIOTAC_CONFIG").unwrap_or_else(|_| "miotac.toml".to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MIOTAC_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("MIOTAC_PORT")
            && let Ok(port) = val.parse()
        {
            self.server.port = port;
        }
        if let Ok(val) = std::env::var("MIOTAC_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("MIOTAC_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("MIOTAC_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.polling.scan_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "scan_interval_secs must be non-zero".to_string(),
            ));
        }
        if self.polling.setup_retry_secs == 0 {
            return Err(ConfigError::Validation(
                "setup_retry_secs must be non-zero".to_string(),
            ));
        }
        for device in &self.devices {
            device.entry_data()?;
        }
        for unit in &self.simulation.devices {
            unit.token()?;
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn integration_settings(&self) -> IntegrationSettings {
        IntegrationSettings {
            scan_interval: Duration::from_secs(self.polling.scan_interval_secs),
            setup_retry: Duration::from_secs(self.polling.setup_retry_secs),
        }
    }
}

impl DeviceConfig {
    /// Settings to import as a config entry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for a malformed token, a blank
    /// host or name, or zero retries.
    pub fn entry_data(&self) -> Result<EntryData, ConfigError> {
        let data = EntryData {
            host: self.host.clone(),
            token: parse_token(&self.host, &self.token)?,
            name: self.name.clone(),
            retries: self.retries,
        };
        data.validate()
            .map_err(|err| ConfigError::Validation(format!("device {}: {err}", self.host)))?;
        Ok(data)
    }
}

impl SimulatedDeviceConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for a malformed token.
    pub fn token(&self) -> Result<Token, ConfigError> {
        parse_token(&self.host, &self.token)
    }
}

fn parse_token(host: &str, token: &str) -> Result<Token, ConfigError> {
    Token::parse(token).map_err(|err| ConfigError::Validation(format!("device {host}: {err}")))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8123,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:miotac.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "miotacd=info,miotac_app=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        let settings = IntegrationSettings::default();
        Self {
            scan_interval_secs: settings.scan_interval.as_secs(),
            setup_retry_secs: settings.setup_retry.as_secs(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
