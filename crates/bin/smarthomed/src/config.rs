//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `smarthome.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Device lock settings.
    pub dispatch: DispatchConfig,
    /// Device node settings.
    pub devnode: DevnodeConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Device lock configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Give up waiting for a device lock after this many milliseconds.
    /// `0` waits until interrupted.
    pub lock_timeout_ms: u64,
}

/// Device node configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DevnodeConfig {
    /// Directory the device nodes are registered under.
    pub dev_root: PathBuf,
}

impl Config {
    /// Load configuration from `smarthome.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("smarthome.toml")?;
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
        if let Ok(val) = std::env::var("SMARTHOME_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("SMARTHOME_LOCK_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                self.dispatch.lock_timeout_ms = ms;
            }
        }
        if let Ok(val) = std::env::var("SMARTHOME_DEV_ROOT") {
            self.devnode.dev_root = PathBuf::from(val);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.devnode.dev_root.is_absolute() {
            return Err(ConfigError::Validation(format!(
                "dev_root must be absolute, got {}",
                self.devnode.dev_root.display()
            )));
        }
        Ok(())
    }

    /// Lock wait limit, `None` when waits only end by interruption.
    #[must_use]
    pub fn lock_timeout(&self) -> Option<Duration> {
        (self.dispatch.lock_timeout_ms > 0)
            .then(|| Duration::from_millis(self.dispatch.lock_timeout_ms))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "smarthomed=info,smarthome=info".to_string(),
        }
    }
}

impl Default for DevnodeConfig {
    fn default() -> Self {
        Self {
            dev_root: PathBuf::from("/dev"),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
