//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Config file
//! 3. CLI flags (not handled here)
//!
//! # Config Locations
//!
//! Searched in order:
//! 1. An explicit path (the CLI `--config` flag)
//! 2. `$GITPROV_CONFIG` if set
//! 3. `<config_dir>/gitprov/config.toml`
//!
//! A missing file yields defaults. A file that exists but cannot be parsed or
//! fails validation is an error.
//!
//! # Example
//!
//! ```no_run
//! use gitprov::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("retry attempts: {}", config.retry_attempts());
//! println!("user: {:?}", config.git_user());
//! ```

pub mod schema;

pub use schema::{FileConfig, GitSection, RetrySection};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "GITPROV_CONFIG";

const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF_SECS: u64 = 3;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents
    pub file: FileConfig,
    /// Path the file was loaded from, if any
    loaded_from: Option<PathBuf>,
}

impl Config {
    /// Load configuration.
    ///
    /// `explicit` takes precedence over `$GITPROV_CONFIG`, which takes
    /// precedence over the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed or
    /// validated. An explicitly named file that does not exist is a read error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;

        Ok(Self {
            file,
            loaded_from: Some(path.to_path_buf()),
        })
    }

    /// `<config_dir>/gitprov/config.toml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gitprov").join("config.toml"))
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Username for HTTP basic auth.
    pub fn git_user(&self) -> Option<&str> {
        self.file.git.as_ref().and_then(|g| g.user.as_deref())
    }

    /// Provider name used when creating remotes.
    ///
    /// `None` means the provider is inferred from the host.
    pub fn provider(&self) -> Option<&str> {
        self.file.git.as_ref().and_then(|g| g.provider.as_deref())
    }

    /// Default branch override for new repositories.
    pub fn default_branch(&self) -> Option<&str> {
        self.file
            .git
            .as_ref()
            .and_then(|g| g.default_branch.as_deref())
    }

    /// Total attempts for clone and push. Defaults to 3.
    pub fn retry_attempts(&self) -> u32 {
        self.file
            .retry
            .as_ref()
            .and_then(|r| r.attempts)
            .unwrap_or(DEFAULT_RETRY_ATTEMPTS)
    }

    /// Delay between attempts. Defaults to 3 seconds.
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(
            self.file
                .retry
                .as_ref()
                .and_then(|r| r.backoff_secs)
                .unwrap_or(DEFAULT_RETRY_BACKOFF_SECS),
        )
    }

    /// Path the configuration was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }
}
