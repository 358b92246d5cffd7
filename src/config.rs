//! Configuration management for the Hardware Lab server

use config::{Config, ConfigError, Environment, File, Map};
use serde::Deserialize;
use std::env;

use crate::models::policy::LendingPolicy;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL URL. When absent the server runs on the in-memory store.
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    /// Directory for daily-rolling log files, stdout only when unset
    pub directory: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis URL. The public hardware snapshot is not cached when absent.
    pub url: Option<String>,
    pub api_cache_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HardwareConfig {
    /// Minutes a pending request stays reserved before it expires
    pub request_expiry_minutes: i64,
    /// Whether hackers may create new requests at all
    pub hackers_can_request: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub hardware: HardwareConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config", None)
    }

    /// Load from the files in `dir`. `vars` stands in for the process
    /// environment when set.
    fn load_from(dir: &str, vars: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let var = |key: &str| match &vars {
            Some(vars) => vars.get(key).cloned(),
            None => env::var(key).ok(),
        };
        let run_mode = var("RUN_MODE").unwrap_or_else(|| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name(&format!("{}/default", dir)).required(false))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("{}/{}", dir, run_mode)).required(false))
            // Add environment variables (with prefix HWLAB__)
            .add_source(
                Environment::with_prefix("HWLAB")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars.clone()),
            )
            .set_override_option("database.url", var("DATABASE_URL"))?
            .set_override_option("auth.jwt_secret", var("JWT_SECRET"))?
            .set_override_option("redis.url", var("REDIS_URL"))?
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.hardware.request_expiry_minutes < 0 {
            return Err(ConfigError::Message(format!(
                "hardware.request_expiry_minutes must not be negative, got {}",
                self.hardware.request_expiry_minutes
            )));
        }
        Ok(())
    }

    /// Lending rules handed to the services at construction
    pub fn lending_policy(&self) -> LendingPolicy {
        LendingPolicy::new(
            self.hardware.request_expiry_minutes,
            self.hardware.hackers_can_request,
        )
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            min_connections: 2,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-this-secret-in-production".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: None,
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_cache_seconds: 60,
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            request_expiry_minutes: 30,
            hackers_can_request: true,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
            redis: RedisConfig::default(),
            hardware: HardwareConfig::default(),
        }
    }
}
