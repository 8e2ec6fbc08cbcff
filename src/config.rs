//! Application configuration
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL; the in-memory store is used when absent
    pub database_url: Option<String>,
    /// Load the demo complaints at startup
    pub seed_demo_data: bool,
    /// Simulated delay of the built-in classifier
    pub classifier_latency: Duration,
    /// Upper bound on a single classification call
    pub classification_timeout: Duration,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// CORS allowed origins (production only)
    pub cors_origins: Vec<String>,
    /// Environment (development/production)
    pub environment: Environment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("ENVIRONMENT")
            .unwrap_or_else(|| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        };

        // DATABASE_URL, or the individual components when all are present
        let database_url = lookup("DATABASE_URL").or_else(|| {
            let host = lookup("DATABASE_SERVER_HOST")?;
            let port = lookup("DATABASE_SERVER_PORT").unwrap_or_else(|| "5432".to_string());
            let user = lookup("DATABASE_SERVER_USER")?;
            let password = lookup("DATABASE_PASSWORD")?;
            let db = lookup("DATABASE_DB")?;
            Some(format!(
                "postgres://{}:{}@{}:{}/{}",
                user, password, host, port, db
            ))
        });

        // Demo data only makes sense against a throwaway store
        let seed_default = environment == Environment::Development && database_url.is_none();

        Ok(Config {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            seed_demo_data: parse_bool(&lookup, "SEED_DEMO_DATA", seed_default)?,
            classifier_latency: Duration::from_millis(parse_or(
                &lookup,
                "CLASSIFIER_LATENCY_MS",
                0,
            )?),
            classification_timeout: Duration::from_secs(parse_or(
                &lookup,
                "CLASSIFICATION_TIMEOUT_SECS",
                10,
            )?),
            max_body_size: parse_or(&lookup, "MAX_BODY_SIZE", 1024 * 1024)?, // 1MB default
            cors_origins: lookup("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| vec!["http://localhost:8080".to_string()]),
            database_url,
            environment,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Get the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{}={}", key, raw))),
        None => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(format!("{}={}", key, v))),
        },
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
