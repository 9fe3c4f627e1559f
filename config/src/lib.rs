//! # Configuration Management for regcache
//!
//! This crate provides centralized configuration structures for all regcache components,
//! including database, cache, and write-coordinator settings.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{CacheConfig, CoordinatorConfig, DatabaseConfig};
//!
//! let db_config = DatabaseConfig::new(
//!     "localhost".to_string(), 5432, "myapp".to_string(),
//!     "postgres".to_string(), "password".to_string(),
//!     1, 10, 30, 600, 3600,
//! );
//!
//! let cache_config = CacheConfig::new("redis://localhost:6379".to_string(), 3000);
//! let coordinator_config = CoordinatorConfig::default();
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [database]
//! host = "localhost"
//! port = 5432
//! database = "myapp"
//! username = "postgres"
//! password = "password"
//! min_connections = 1
//! max_connections = 10
//! connection_timeout_seconds = 30
//! idle_timeout_seconds = 600
//! max_lifetime_seconds = 3600
//!
//! [cache]
//! redis_url = "redis://localhost:6379"
//! connection_timeout_ms = 3000
//! key_prefix = ""
//! point_ttl_seconds = 0
//! listing_ttl_seconds = 300
//! scan_count = 500
//!
//! [coordinator]
//! insert_timeout_ms = 5000
//! cache_timeout_ms = 1000
//!
//! [coordinator.retry]
//! max_attempts = 3
//! initial_delay_ms = 50
//! max_delay_ms = 2000
//! backoff_multiplier = 2.0
//! jitter = true
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Load from the file named by REGCACHE_CONFIG, or ./regcache.toml
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::{env, path::Path, time::Duration};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./regcache.toml";
const CONFIG_PATH_VAR: &str = "REGCACHE_CONFIG";

/// Upper bound on cache TTLs, ten years
pub const MAX_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Environment variable error: {0}")]
    Env(#[from] env::VarError),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub max_lifetime_seconds: u64,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: String,
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
    /// Application namespace prepended to every key. Empty means none.
    #[serde(default)]
    pub key_prefix: String,
    /// TTL for point entries; 0 means no expiration.
    #[serde(default)]
    pub point_ttl_seconds: u64,
    /// TTL for listing entries; 0 means no expiration.
    #[serde(default = "default_listing_ttl_seconds")]
    pub listing_ttl_seconds: u64,
    /// COUNT hint used while scanning a namespace for deletion
    #[serde(default = "default_scan_count")]
    pub scan_count: usize,
}

/// Write coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default = "default_insert_timeout_ms")]
    pub insert_timeout_ms: u64,
    #[serde(default = "default_cache_timeout_ms")]
    pub cache_timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Bounded retry with exponential backoff for retryable cache failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

fn default_connection_timeout_ms() -> u64 {
    3000
}

fn default_listing_ttl_seconds() -> u64 {
    300
}

fn default_scan_count() -> usize {
    500
}

fn default_insert_timeout_ms() -> u64 {
    5000
}

fn default_cache_timeout_ms() -> u64 {
    1000
}

impl AppConfig {
    /// Load configuration from TOML file specified in .env or defaults
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is fine, a malformed one is not
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(e.into());
            }
        }

        if let Ok(config_path) = env::var(CONFIG_PATH_VAR) {
            Self::from_file(&config_path)
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::from_file(DEFAULT_CONFIG_PATH)
        } else {
            Err(ConfigError::Invalid(format!(
                "Config path must be specified in .env file as {} or in {} file",
                CONFIG_PATH_VAR, DEFAULT_CONFIG_PATH
            )))
        }
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Database validations
        if self.database.host.is_empty() {
            return Err(ConfigError::Invalid(
                "Database host cannot be empty".to_string(),
            ));
        }
        if self.database.port == 0 {
            return Err(ConfigError::Invalid(
                "Database port cannot be zero".to_string(),
            ));
        }
        if self.database.database.is_empty() {
            return Err(ConfigError::Invalid(
                "Database name cannot be empty".to_string(),
            ));
        }
        if self.database.username.is_empty() {
            return Err(ConfigError::Invalid(
                "Database username cannot be empty".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "Database max_connections must be greater than 0".to_string(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(
                "Database min_connections cannot be greater than max_connections".to_string(),
            ));
        }
        if self.database.connection_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "Database connection_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        // Cache validations
        if self.cache.redis_url.is_empty() {
            return Err(ConfigError::Invalid(
                "Redis URL cannot be empty".to_string(),
            ));
        }
        if self.cache.connection_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Cache connection_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.cache.key_prefix.contains(['*', '?', '[', ']']) {
            return Err(ConfigError::Invalid(
                "Cache key_prefix cannot contain glob characters".to_string(),
            ));
        }
        if self.cache.scan_count == 0 {
            return Err(ConfigError::Invalid(
                "Cache scan_count must be greater than 0".to_string(),
            ));
        }
        if self.cache.point_ttl_seconds > MAX_TTL_SECONDS
            || self.cache.listing_ttl_seconds > MAX_TTL_SECONDS
        {
            return Err(ConfigError::Invalid(format!(
                "Cache TTLs cannot exceed {} seconds",
                MAX_TTL_SECONDS
            )));
        }

        // Coordinator validations
        self.coordinator.validate()
    }
}

impl CacheConfig {
    /// Create a new cache configuration with default TTLs and no key prefix
    pub fn new(redis_url: String, connection_timeout_ms: u64) -> Self {
        Self {
            redis_url,
            connection_timeout_ms,
            key_prefix: String::new(),
            point_ttl_seconds: 0,
            listing_ttl_seconds: default_listing_ttl_seconds(),
            scan_count: default_scan_count(),
        }
    }

    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    pub fn with_listing_ttl(mut self, seconds: u64) -> Self {
        self.listing_ttl_seconds = seconds;
        self
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn point_ttl(&self) -> Duration {
        Duration::from_secs(self.point_ttl_seconds)
    }

    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_seconds)
    }
}

impl CoordinatorConfig {
    pub fn insert_timeout(&self) -> Duration {
        Duration::from_millis(self.insert_timeout_ms)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.insert_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Coordinator insert_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.cache_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Coordinator cache_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "Retry max_attempts must be at least 1".to_string(),
            ));
        }
        let multiplier = self.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "Retry backoff_multiplier must be a finite number of at least 1.0".to_string(),
            ));
        }
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::Invalid(
                "Retry initial_delay_ms cannot be greater than max_delay_ms".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            insert_timeout_ms: default_insert_timeout_ms(),
            cache_timeout_ms: default_cache_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }
}

impl RetryConfig {
    /// Configuration that makes a single attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 50,
            max_delay_ms: 2000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database configuration
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        host: String,
        port: u16,
        database: String,
        username: String,
        password: String,
        min_connections: u32,
        max_connections: u32,
        connection_timeout_seconds: u64,
        idle_timeout_seconds: u64,
        max_lifetime_seconds: u64,
    ) -> Self {
        Self {
            host,
            port,
            database,
            username,
            password,
            min_connections,
            max_connections,
            connection_timeout_seconds,
            idle_timeout_seconds,
            max_lifetime_seconds,
        }
    }

    /// Build connection string
    pub fn connection_string(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}
