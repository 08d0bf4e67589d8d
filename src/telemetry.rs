//! Process-wide tracing subscriber setup.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Installs the global `tracing` subscriber.
///
/// The filter comes from `config.log_level` (any `EnvFilter` directive, e.g.
/// `info` or `vote_cache=debug,info`); output is human-readable text or
/// newline-delimited JSON depending on `config.log_format`.
///
/// # Errors
///
/// Returns an error if the filter does not parse or a global subscriber is
/// already installed.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("Invalid log level '{}'", config.log_level))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if config.log_format == "json" {
        builder.json().with_current_span(false).try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
}
