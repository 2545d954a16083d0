//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Config values are validated after parsing: worker counts must be in
//! range, thread names non-empty, and log levels one of the known names.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Upper bound on configured worker threads.
pub const MAX_WORKER_THREADS: usize = 256;

/// Log levels accepted in `[logging] level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Runtime configuration.
///
/// # Example
///
/// ```toml
/// [dispatcher]
/// worker_threads = 8
/// thread_name = "gitteh-worker"
///
/// [logging]
/// level = "debug"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Worker pool settings
    pub dispatcher: Option<DispatcherConfig>,

    /// Logging settings
    pub logging: Option<LoggingConfig>,
}

impl RuntimeConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.validate()?;
        }
        if let Some(logging) = &self.logging {
            logging.validate()?;
        }
        Ok(())
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Number of worker threads executing engine calls
    pub worker_threads: Option<usize>,

    /// Name given to worker threads (suffixed with the worker index)
    pub thread_name: Option<String>,
}

impl DispatcherConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(workers) = self.worker_threads {
            if workers == 0 || workers > MAX_WORKER_THREADS {
                return Err(ConfigError::InvalidValue(format!(
                    "dispatcher.worker_threads must be between 1 and {}, got {}",
                    MAX_WORKER_THREADS, workers
                )));
            }
        }
        if let Some(name) = &self.thread_name {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "dispatcher.thread_name cannot be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default level when `GITTEH_LOG` is not set
    pub level: Option<String>,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(level) = &self.level {
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid log level '{}', must be one of: {}",
                    level,
                    LOG_LEVELS.join(", ")
                )));
            }
        }
        Ok(())
    }
}
