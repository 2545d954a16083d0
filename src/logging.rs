//! logging
//!
//! `tracing` subscriber setup.
//!
//! The filter comes from `GITTEH_LOG` (same syntax as `RUST_LOG`), falling
//! back to the configured level. Installing a subscriber when one is already
//! set is not an error; the first one wins.
//!
//! # Usage
//!
//! ```no_run
//! use gitteh::logging;
//!
//! logging::init();
//! tracing::debug!("dispatcher ready");
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::core::config::{Config, DEFAULT_LOG_LEVEL};

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "GITTEH_LOG";

/// Install a subscriber with the default level.
pub fn init() -> bool {
    init_with_filter(DEFAULT_LOG_LEVEL)
}

/// Install a subscriber using the level from `config`.
pub fn init_from_config(config: &Config) -> bool {
    init_with_filter(config.log_level())
}

/// Install a subscriber with `default_directive` unless `GITTEH_LOG` is set.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_with_filter(default_directive: &str) -> bool {
    let filter = resolve_filter(default_directive);
    let layer = fmt::layer()
        .with_target(false)
        .with_thread_names(true)
        .with_filter(filter);

    tracing_subscriber::registry().with(layer).try_init().is_ok()
}

/// Install a subscriber that writes through the test harness capture.
pub fn init_test_writer() -> bool {
    let layer = fmt::layer()
        .with_test_writer()
        .with_thread_names(true)
        .with_filter(resolve_filter("debug"));

    tracing_subscriber::registry().with(layer).try_init().is_ok()
}

fn resolve_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive))
}
