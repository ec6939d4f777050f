//! Client configuration: server endpoint and socket timeout.
//!
//! Settings come from, in increasing priority: built-in defaults, an optional
//! `config.json`, and `TERRAGEN_RPC_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 36971;
pub const DEFAULT_TIMEOUT_SECS: f64 = 10.0;

pub const ENV_HOST: &str = "TERRAGEN_RPC_HOST";
pub const ENV_PORT: &str = "TERRAGEN_RPC_PORT";
pub const ENV_TIMEOUT: &str = "TERRAGEN_RPC_TIMEOUT";

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Connection settings for the Terragen RPC server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Socket timeout in seconds, applied to connect, write and every read
    #[serde(default = "default_timeout")]
    pub timeout_secs: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Convert seconds to a timeout, rejecting zero, negative and non-finite values.
///
/// # Errors
///
/// Returns `ConfigError::Invalid` if the value is not a positive finite number.
pub fn timeout_from_secs(secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::Invalid(format!(
            "timeout must be a positive number of seconds, got {secs}"
        )));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::Invalid(e.to_string()))
}

impl ClientConfig {
    /// Load config from file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid JSON, or
    /// holds invalid values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from `path`, or from the default location when `None`, then apply
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or an override is invalid.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| ConfigPaths::new().map(|paths| paths.config_file));

        let config = match path {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };

        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `TERRAGEN_RPC_*` overrides looked up through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if an override cannot be parsed or the
    /// resulting config is invalid.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }

        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .trim()
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("{ENV_PORT}={port}: {e}")))?;
        }

        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            self.timeout_secs = timeout
                .trim()
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("{ENV_TIMEOUT}={timeout}: {e}")))?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check that the settings can be used to open a connection.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }
        timeout_from_secs(self.timeout_secs)?;
        Ok(())
    }

    /// The timeout as a `Duration`, falling back to the default for invalid values.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        timeout_from_secs(self.timeout_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS))
    }
}

/// Standard locations for client files
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Config directory (~/.config/terragen-rpc on Linux)
    pub config: PathBuf,

    /// Config file path
    pub config_file: PathBuf,
}

impl ConfigPaths {
    /// Platform config paths, or `None` if no home directory can be determined.
    #[must_use]
    pub fn new() -> Option<Self> {
        let project = ProjectDirs::from("", "", "terragen-rpc")?;
        Some(Self::with_base(project.config_dir().to_path_buf()))
    }

    #[must_use]
    pub fn with_base(base: PathBuf) -> Self {
        Self {
            config_file: base.join("config.json"),
            config: base,
        }
    }
}
