//! Application configuration.

use serde::Deserialize;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Report collection configuration.
    #[serde(default)]
    pub collection: CollectionConfig,
    /// Synchronization configuration.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (`SQLite` or `PostgreSQL`).
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Report collection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    /// Collection path reports are appended under.
    #[serde(default = "default_collection_path")]
    pub path: String,
    /// Base URL of a remote collection endpoint. Local database when unset.
    #[serde(default)]
    pub remote_url: Option<String>,
}

/// Synchronization configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Polling interval for subscriptions over a remote collection.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Capacity of change-feed broadcast channels.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl SyncConfig {
    /// Polling interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

fn default_database_url() -> String {
    "sqlite://reportline.db?mode=rwc".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_min_connections() -> u32 {
    1
}

fn default_collection_path() -> String {
    "reports".to_string()
}

const fn default_poll_interval_ms() -> u64 {
    2000
}

const fn default_channel_capacity() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            path: default_collection_path(),
            remote_url: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `REPORTLINE_ENV`)
    /// 4. Environment variables with `REPORTLINE__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("REPORTLINE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("REPORTLINE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
