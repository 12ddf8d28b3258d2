//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `WARUNG_FIRESTORE_PROJECT_ID` - Cloud project that owns the document database
//! - `WARUNG_FIRESTORE_API_KEY` - Web API key for the database's REST endpoint
//!
//! ## Optional
//! - `WARUNG_CART_PATH` - Cart file location (default: warung-cart.json)
//! - `WARUNG_FIRESTORE_DATABASE_ID` - Database id (default: (default))
//! - `WARUNG_FIRESTORE_ENDPOINT` - Endpoint override, e.g. a local emulator
//! - `WARUNG_FIRESTORE_POLL_MS` - Change poll interval in milliseconds (default: 2000)

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;
use warung_store::FirestoreConfig;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Where the durable cart file lives
    pub cart_path: PathBuf,
    /// Document database connection settings
    pub firestore: FirestoreConfig,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            cart_path: PathBuf::from(get_env_or_default("WARUNG_CART_PATH", "warung-cart.json")),
            firestore: firestore_from_env()?,
        })
    }
}

/// Build the document database settings from the shared `WARUNG_FIRESTORE_*`
/// variables.
fn firestore_from_env() -> Result<FirestoreConfig, ConfigError> {
    let mut config = FirestoreConfig::new(
        get_required_env("WARUNG_FIRESTORE_PROJECT_ID")?,
        get_required_secret("WARUNG_FIRESTORE_API_KEY")?,
    );
    config.database_id = get_env_or_default("WARUNG_FIRESTORE_DATABASE_ID", "(default)");

    if let Some(endpoint) = get_optional_env("WARUNG_FIRESTORE_ENDPOINT") {
        config.endpoint = Some(endpoint.parse::<Url>().map_err(|e| {
            ConfigError::InvalidEnvVar("WARUNG_FIRESTORE_ENDPOINT".to_string(), e.to_string())
        })?);
    }

    let poll_ms = get_env_or_default("WARUNG_FIRESTORE_POLL_MS", "2000")
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("WARUNG_FIRESTORE_POLL_MS".to_string(), e.to_string())
        })?;
    config.poll_interval = Duration::from_millis(poll_ms);

    Ok(config)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
