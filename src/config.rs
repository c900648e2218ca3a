//! Configuration loader for the `envairo-metrics` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
//!
//! Only the admin registry database is configured here; tenant databases are
//! described by per-app descriptors stored in the registry (see `registry`).

use std::env;

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Admin registry MySQL connection string.
    pub db_url: String,

    /// Maximum number of connections in the admin registry pool.
    pub db_pool_max: u32,

    /// Maximum number of connections in each per-request tenant pool.
    pub tenant_pool_max: u32,

    /// HTTP listen port.
    pub port: u16,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – admin registry MySQL connection string
///
/// Optional:
/// - `DB_POOL_MAX` – max admin pool connections (default: 10)
/// - `TENANT_POOL_MAX` – max connections per tenant pool (default: 4)
/// - `PORT` – HTTP listen port (default: 5000)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 10);
    let tenant_pool_max = parse_env_u32!("TENANT_POOL_MAX", 4);
    let port = parse_env_u32!("PORT", 5000);
    let port = u16::try_from(port).map_err(|_| anyhow!("Invalid PORT: {}", port))?;

    Ok(Config {
        db_url,
        db_pool_max,
        tenant_pool_max,
        port,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords while showing
    /// all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        // Mask the password in the database URL for security
        let masked_db_url = if let Some(at_pos) = self.db_url.rfind('@') {
            if let Some(colon_pos) = self.db_url[..at_pos].rfind(':') {
                format!(
                    "{}:****{}",
                    &self.db_url[..colon_pos],
                    &self.db_url[at_pos..]
                )
            } else {
                self.db_url.clone()
            }
        } else {
            self.db_url.clone()
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL    : {}", masked_db_url);
        tracing::info!("  DB_POOL_MAX     : {}", self.db_pool_max);
        tracing::info!("  TENANT_POOL_MAX : {}", self.tenant_pool_max);
        tracing::info!("  PORT            : {}", self.port);
    }
}
