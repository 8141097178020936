//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JWT_SECRET` - Session token signing secret (min 32 chars)
//! - `DATABASE_URL` - SQLite connection string, only when `STORAGE_BACKEND=sqlite`
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 3000)
//! - `STORAGE_BACKEND` - `document` or `sqlite` (default: document)
//! - `DOCUMENT_STORE_URL` - Document store base URL (default: http://localhost:5004)
//! - `COOKIE_SECURE` - Mark the session cookie `Secure` (default: false)

use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const DEFAULT_DOCUMENT_STORE_URL: &str = "http://localhost:5004";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Where records are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// External json-server style document store.
    Document { base_url: String },
    /// Local SQLite database.
    Sqlite { database_url: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub jwt_secret: SecretString,
    pub storage: StorageConfig,
    pub cookie_secure: bool,
}

impl Config {
    /// Load configuration from environment variables. A `.env` file, if
    /// any, must already have been loaded by the caller.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = get_or("HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_or("PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;

        let jwt_secret = SecretString::from(
            lookup("JWT_SECRET").ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?,
        );
        validate_jwt_secret(&jwt_secret, "JWT_SECRET")?;

        let storage = match get_or("STORAGE_BACKEND", "document").as_str() {
            "document" => StorageConfig::Document {
                base_url: get_or("DOCUMENT_STORE_URL", DEFAULT_DOCUMENT_STORE_URL),
            },
            "sqlite" => StorageConfig::Sqlite {
                database_url: lookup("DATABASE_URL")
                    .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?,
            },
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "STORAGE_BACKEND".to_string(),
                    format!("expected `document` or `sqlite`, got `{other}`"),
                ))
            }
        };

        let cookie_secure = parse_bool(&get_or("COOKIE_SECURE", "false"))
            .ok_or_else(|| ConfigError::InvalidEnvVar("COOKIE_SECURE".to_string(), "expected a boolean".to_string()))?;

        Ok(Self {
            host,
            port,
            jwt_secret,
            storage,
            cookie_secure,
        })
    }

    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}
