//! Log output for the garlic binary
//!
//! Logs go to stderr so that stdout carries only command reports. The
//! filter is read from `GARLIC_LOG` using `EnvFilter` directives and
//! defaults to `warn`.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "GARLIC_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Installs the global subscriber. Does nothing if one is already set.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
