//! Configuration loader for the `agroflow` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.

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

/// Read an optional string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Port the HTTP server binds on.
    pub port: u16,

    /// Path to the tabular crop classifier artifact.
    pub crop_model_path: String,

    /// Path to the soil image classifier artifact.
    pub soil_model_path: String,

    /// HMAC secret for signing session tokens.
    pub session_secret: String,

    /// Session token lifetime in hours.
    pub session_ttl_hours: u32,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
/// - `SESSION_SECRET` – HMAC secret for session tokens
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `PORT` – HTTP port (default: 8080)
/// - `CROP_MODEL_PATH` – tabular model artifact (default: models/crop.json)
/// - `SOIL_MODEL_PATH` – image model artifact (default: models/soil.json)
/// - `SESSION_TTL_HOURS` – session lifetime (default: 24)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let session_secret = require_env!("SESSION_SECRET");
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);
    let port = u16::try_from(parse_env_u32!("PORT", 8080))
        .map_err(|_| anyhow!("Invalid PORT: out of range"))?;
    let crop_model_path = env_or!("CROP_MODEL_PATH", "models/crop.json");
    let soil_model_path = env_or!("SOIL_MODEL_PATH", "models/soil.json");
    let session_ttl_hours = parse_env_u32!("SESSION_TTL_HOURS", 24);

    Ok(Config {
        db_url,
        db_pool_max,
        port,
        crop_model_path,
        soil_model_path,
        session_secret,
        session_ttl_hours,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information (database password, session secret) while
    /// showing all configuration values that were loaded.
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
        tracing::info!("  DATABASE_URL      : {}", masked_db_url);
        tracing::info!("  DB_POOL_MAX       : {}", self.db_pool_max);
        tracing::info!("  PORT              : {}", self.port);
        tracing::info!("  CROP_MODEL_PATH   : {}", self.crop_model_path);
        tracing::info!("  SOIL_MODEL_PATH   : {}", self.soil_model_path);
        tracing::info!("  SESSION_SECRET    : ****");
        tracing::info!("  SESSION_TTL_HOURS : {}", self.session_ttl_hours);
    }
}
