//! Configuration loaded from environment variables.
//!
//! Configuration is loaded once at startup and validated before the
//! reconciler starts.
//!
//! ## Optional Variables
//!
//! - `RECONCILE_INTERVAL_SECS` - Seconds between reconciliation cycles (default: 5, max: 3600)
//! - `RECONCILE_FLUSH_ON_SHUTDOWN` - Run a final cycle on shutdown (default: `true`)
//! - `COUNTRY_CODES` - Comma-separated closed set of codes (default: built-in 195 codes)
//! - `RUST_LOG` - Log level (default: `info`)
//! - `LOG_FORMAT` - Log format: `text` or `json` (default: `text`)

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use crate::domain::country::{CountryCode, KNOWN_COUNTRY_CODES};

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub reconcile_interval_secs: u64,
    /// When true, the worker runs one last cycle after its timer is disarmed.
    pub flush_on_shutdown: bool,
    /// Closed set of codes that get a counter shard.
    pub country_codes: Vec<CountryCode>,
    pub log_level: String,
    pub log_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: 5,
            flush_on_shutdown: true,
            country_codes: KNOWN_COUNTRY_CODES.to_vec(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `COUNTRY_CODES` contains a malformed code.
    pub fn from_env() -> Result<Self> {
        let reconcile_interval_secs = env::var("RECONCILE_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let flush_on_shutdown = env::var("RECONCILE_FLUSH_ON_SHUTDOWN")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(true);

        let country_codes =
            Self::load_country_codes().context("Failed to load COUNTRY_CODES")?;

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

        Ok(Self {
            reconcile_interval_secs,
            flush_on_shutdown,
            country_codes,
            log_level,
            log_format,
        })
    }

    /// Loads the known code set.
    ///
    /// Priority:
    /// 1. `COUNTRY_CODES` environment variable (comma-separated)
    /// 2. The built-in [`KNOWN_COUNTRY_CODES`]
    fn load_country_codes() -> Result<Vec<CountryCode>> {
        let Ok(raw) = env::var("COUNTRY_CODES") else {
            return Ok(KNOWN_COUNTRY_CODES.to_vec());
        };

        let mut codes = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| CountryCode::parse(s).with_context(|| format!("in COUNTRY_CODES: '{s}'")))
            .collect::<Result<Vec<_>>>()?;

        codes.sort();
        codes.dedup();
        Ok(codes)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `reconcile_interval_secs` is 0 or greater than 3600
    /// - `country_codes` is empty
    /// - `log_format` is not `text` or `json`
    pub fn validate(&self) -> Result<()> {
        if self.reconcile_interval_secs == 0 {
            anyhow::bail!("RECONCILE_INTERVAL_SECS must be greater than 0");
        }

        if self.reconcile_interval_secs > 3600 {
            anyhow::bail!(
                "RECONCILE_INTERVAL_SECS is too large (max: 3600), got {}",
                self.reconcile_interval_secs
            );
        }

        if self.country_codes.is_empty() {
            anyhow::bail!("COUNTRY_CODES must contain at least one code");
        }

        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            );
        }

        Ok(())
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    /// Prints configuration summary.
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Reconcile interval: {}s", self.reconcile_interval_secs);
        tracing::info!("  Flush on shutdown: {}", self.flush_on_shutdown);
        tracing::info!("  Known country codes: {}", self.country_codes.len());
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
    }
}

/// Loads and validates configuration from environment variables.
///
/// # Errors
///
/// Returns an error if a variable is malformed or validation fails.
///
/// # Note
///
/// This function expects environment variables to be already loaded
/// (see [`load`] for the `.env`-aware variant).
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}

/// Loads `.env` (if present) and then the validated configuration.
///
/// # Errors
///
/// Same as [`load_from_env`].
pub fn load() -> Result<Config> {
    dotenvy::dotenv().ok();
    load_from_env()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        // SAFETY: callers are #[serial], so no concurrent env access
        unsafe {
            env::remove_var("RECONCILE_INTERVAL_SECS");
            env::remove_var("RECONCILE_FLUSH_ON_SHUTDOWN");
            env::remove_var("COUNTRY_CODES");
            env::remove_var("LOG_FORMAT");
        }
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.reconcile_interval_secs = 0;
        assert!(config.validate().is_err());

        config.reconcile_interval_secs = 7200;
        assert!(config.validate().is_err());

        config.reconcile_interval_secs = 5;
        config.log_format = "invalid".to_string();
        assert!(config.validate().is_err());

        config.log_format = "json".to_string();
        assert!(config.validate().is_ok());

        config.country_codes.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();

        let config = load_from_env().unwrap();

        assert_eq!(config.reconcile_interval(), Duration::from_secs(5));
        assert!(config.flush_on_shutdown);
        assert_eq!(config.country_codes.len(), 195);
    }

    #[test]
    #[serial]
    fn test_country_codes_override() {
        clear_env();
        // SAFETY: Tests are run serially due to #[serial], so no concurrent access
        unsafe {
            env::set_var("COUNTRY_CODES", "us, TR,tr,,de");
            env::set_var("RECONCILE_INTERVAL_SECS", "10");
            env::set_var("RECONCILE_FLUSH_ON_SHUTDOWN", "false");
        }

        let config = load_from_env().unwrap();
        let codes: Vec<&str> = config.country_codes.iter().map(|c| c.as_str()).collect();

        assert_eq!(codes, vec!["de", "tr", "us"]);
        assert_eq!(config.reconcile_interval_secs, 10);
        assert!(!config.flush_on_shutdown);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_malformed_country_code_is_rejected() {
        clear_env();
        // SAFETY: Tests are run serially
        unsafe {
            env::set_var("COUNTRY_CODES", "us,usa");
        }

        assert!(Config::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_unparseable_interval_falls_back_to_default() {
        clear_env();
        // SAFETY: Tests are run serially
        unsafe {
            env::set_var("RECONCILE_INTERVAL_SECS", "soon");
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.reconcile_interval_secs, 5);

        clear_env();
    }
}
