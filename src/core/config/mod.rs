//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. `GITTEH_LOG` for the log filter (see [`crate::logging`])
//!
//! # Config Locations
//!
//! Searched in order, first match wins:
//! 1. `$GITTEH_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/gitteh/config.toml`
//! 3. `~/.gitteh/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use gitteh::core::config::Config;
//!
//! let result = Config::load().unwrap();
//! for warning in &result.warnings {
//!     eprintln!("warning: {}", warning.message);
//! }
//! println!("workers: {}", result.config.worker_threads());
//! ```

pub mod schema;

pub use schema::{DispatcherConfig, LoggingConfig, RuntimeConfig};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "GITTEH_CONFIG";

/// Default worker pool size.
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Default worker thread name.
pub const DEFAULT_THREAD_NAME: &str = "gitteh-worker";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

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

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Loaded configuration with defaults applied by its accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents
    pub runtime: RuntimeConfig,
    /// Path the config was loaded from (if any)
    path: Option<PathBuf>,
}

impl Config {
    /// Wrap an in-memory configuration after validating it.
    pub fn new(runtime: RuntimeConfig) -> Result<Self, ConfigError> {
        runtime.validate()?;
        Ok(Self {
            runtime,
            path: None,
        })
    }

    /// Load configuration from default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or
    /// fails validation. Missing files are not an error.
    pub fn load() -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        // 1. Check $GITTEH_CONFIG
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::load_from(&path)?;
                return Ok(ConfigLoadResult { config, warnings });
            }
            warnings.push(ConfigWarning {
                message: format!("{} points to a missing file, ignoring it", CONFIG_ENV),
                path,
            });
        }

        // 2. Check $XDG_CONFIG_HOME/gitteh/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("gitteh/config.toml");
            if path.exists() {
                let config = Self::load_from(&path)?;
                return Ok(ConfigLoadResult { config, warnings });
            }
        }

        // 3. Check ~/.gitteh/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".gitteh/config.toml");
            if path.exists() {
                let config = Self::load_from(&path)?;
                return Ok(ConfigLoadResult { config, warnings });
            }
        }

        // No config found, use defaults
        Ok(ConfigLoadResult {
            config: Config::default(),
            warnings,
        })
    }

    /// Load and validate a specific config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let runtime: RuntimeConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        runtime.validate()?;

        Ok(Self {
            runtime,
            path: Some(path.to_path_buf()),
        })
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Number of worker threads.
    ///
    /// Defaults to 4 if not configured.
    pub fn worker_threads(&self) -> usize {
        self.runtime
            .dispatcher
            .as_ref()
            .and_then(|d| d.worker_threads)
            .unwrap_or(DEFAULT_WORKER_THREADS)
    }

    /// Worker thread name prefix.
    ///
    /// Defaults to "gitteh-worker" if not configured.
    pub fn thread_name(&self) -> &str {
        self.runtime
            .dispatcher
            .as_ref()
            .and_then(|d| d.thread_name.as_deref())
            .unwrap_or(DEFAULT_THREAD_NAME)
    }

    /// Default log level.
    ///
    /// Defaults to "warn" if not configured.
    pub fn log_level(&self) -> &str {
        self.runtime
            .logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Get the path the config was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
