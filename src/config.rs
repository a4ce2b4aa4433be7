//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use std::fmt;

use serde::Deserialize;

use crate::services::token_service::MAX_ACCESS_EXPIRY_HOURS;
use crate::utils::hashing::HashParams;

/// Minimum length of the signing secret and the API key pepper.
pub const MIN_SECRET_BYTES: usize = 32;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `JWT_SECRET` (required): HMAC signing secret, at least 32 bytes
/// - `JWT_EXPIRY_HOURS` (optional): access token lifetime, 1 to 8760, defaults to 24
/// - `API_KEY_PEPPER` (required): API key lookup hash secret, at least 32 bytes
/// - `PASSWORD_HASH_MEMORY_KIB`, `PASSWORD_HASH_ITERATIONS`, `PASSWORD_HASH_PARALLELISM`
///   (optional): Argon2id work factor, defaults 19456 / 2 / 1
/// - `CORS_ALLOWED_ORIGINS` (optional): comma-separated origins, defaults to
///   `http://localhost:5173`
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
#[derive(Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    pub jwt_secret: String,

    #[serde(default = "default_jwt_expiry_hours")]
    pub jwt_expiry_hours: i64,

    pub api_key_pepper: String,

    #[serde(default = "default_hash_memory_kib")]
    pub password_hash_memory_kib: u32,

    #[serde(default = "default_hash_iterations")]
    pub password_hash_iterations: u32,

    #[serde(default = "default_hash_parallelism")]
    pub password_hash_parallelism: u32,

    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: String,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_jwt_expiry_hours() -> i64 {
    24
}

fn default_hash_memory_kib() -> u32 {
    19456
}

fn default_hash_iterations() -> u32 {
    2
}

fn default_hash_parallelism() -> u32 {
    1
}

fn default_cors_origins() -> String {
    "http://localhost:5173".to_string()
}

fn default_max_connections() -> u32 {
    5
}

/// Configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("{name} must be at least {MIN_SECRET_BYTES} bytes")]
    SecretTooShort { name: &'static str },

    #[error("JWT_EXPIRY_HOURS must be between 1 and {MAX_ACCESS_EXPIRY_HOURS}")]
    InvalidExpiry,
}

/// Secrets and work factors handed to the services at construction.
#[derive(Clone)]
pub struct SecuritySettings {
    pub jwt_secret: Vec<u8>,
    pub jwt_expiry_hours: i64,
    pub api_key_pepper: Vec<u8>,
    pub hash_params: HashParams,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL, JWT_SECRET)
    /// - Environment variable values cannot be parsed into expected types
    /// - A secret is shorter than 32 bytes or the expiry is out of range
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::SecretTooShort { name: "JWT_SECRET" });
        }
        if self.api_key_pepper.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::SecretTooShort {
                name: "API_KEY_PEPPER",
            });
        }
        if !(1..=MAX_ACCESS_EXPIRY_HOURS).contains(&self.jwt_expiry_hours) {
            return Err(ConfigError::InvalidExpiry);
        }
        Ok(())
    }

    /// Allowed CORS origins, trimmed, empty entries dropped.
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn security(&self) -> SecuritySettings {
        SecuritySettings {
            jwt_secret: self.jwt_secret.as_bytes().to_vec(),
            jwt_expiry_hours: self.jwt_expiry_hours,
            api_key_pepper: self.api_key_pepper.as_bytes().to_vec(),
            hash_params: HashParams {
                memory_kib: self.password_hash_memory_kib,
                iterations: self.password_hash_iterations,
                parallelism: self.password_hash_parallelism,
            },
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"<redacted>")
            .field("server_port", &self.server_port)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiry_hours", &self.jwt_expiry_hours)
            .field("api_key_pepper", &"<redacted>")
            .field("password_hash_memory_kib", &self.password_hash_memory_kib)
            .field("password_hash_iterations", &self.password_hash_iterations)
            .field("password_hash_parallelism", &self.password_hash_parallelism)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("database_max_connections", &self.database_max_connections)
            .finish()
    }
}

impl fmt::Debug for SecuritySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecuritySettings")
            .field("jwt_expiry_hours", &self.jwt_expiry_hours)
            .field("hash_params", &self.hash_params)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn required() -> Vec<(String, String)> {
        vars(&[
            ("DATABASE_URL", "postgres://localhost/portal"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("API_KEY_PEPPER", "fedcba9876543210fedcba9876543210"),
        ])
    }

    #[test]
    fn defaults_apply() {
        let config: Config = envy::from_iter(required()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.jwt_expiry_hours, 24);
        assert_eq!(config.password_hash_memory_kib, 19456);
        assert_eq!(config.password_hash_iterations, 2);
        assert_eq!(config.password_hash_parallelism, 1);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.cors_origins(), vec!["http://localhost:5173"]);
    }

    #[test]
    fn short_secret_is_rejected() {
        let mut env = required();
        env.retain(|(k, _)| k != "JWT_SECRET");
        env.push(("JWT_SECRET".into(), "too-short".into()));

        let config: Config = envy::from_iter(env).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SecretTooShort { name: "JWT_SECRET" })
        ));
    }

    #[test]
    fn expiry_must_be_within_a_year() {
        for (hours, ok) in [("0", false), ("8760", true), ("8761", false), ("10000000000", false)] {
            let mut env = required();
            env.push(("JWT_EXPIRY_HOURS".into(), hours.into()));

            let config: Config = envy::from_iter(env).unwrap();
            assert_eq!(config.validate().is_ok(), ok, "JWT_EXPIRY_HOURS={hours}");
            if !ok {
                assert!(matches!(config.validate(), Err(ConfigError::InvalidExpiry)));
            }
        }
    }

    #[test]
    fn cors_origins_are_split() {
        let mut env = required();
        env.push((
            "CORS_ALLOWED_ORIGINS".into(),
            "https://portal.example, http://localhost:5173,,".into(),
        ));

        let config: Config = envy::from_iter(env).unwrap();
        assert_eq!(
            config.cors_origins(),
            vec!["https://portal.example", "http://localhost:5173"]
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let config: Config = envy::from_iter(required()).unwrap();
        let rendered = format!("{config:?}");

        assert!(!rendered.contains("0123456789abcdef"));
        assert!(!rendered.contains("postgres://"));
    }
}
