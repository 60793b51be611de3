//! Agent configuration loading from file and environment variables.

use mrtrace_dispatch::DeliverySettings;
use mrtrace_lrs::LrsConfig;
use serde::Deserialize;
use thiserror::Error;

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Where statements are delivered.
    #[serde(default)]
    pub lrs: LrsConfig,

    /// Local storage for the identity and the statement queue.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Worker pool and drain policy.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Busy timeout applied to every connection, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Delivery configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryConfig {
    #[serde(flatten)]
    pub settings: DeliverySettings,

    /// Seconds between background drains of the queue. `0` drains once at
    /// startup and exits.
    #[serde(default)]
    pub drain_interval_seconds: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "mrtrace_dispatch=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_db_path() -> String {
    "mrtrace.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `MRTRACE_LRS_ENDPOINT` overrides `lrs.endpoint`
/// - `MRTRACE_LRS_USERNAME` overrides `lrs.username`
/// - `MRTRACE_LRS_PASSWORD` overrides `lrs.password`
/// - `MRTRACE_DB_PATH` overrides `database.path`
/// - `MRTRACE_LOG_LEVEL` overrides `logging.level`
/// - `MRTRACE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `MRTRACE_DRAIN_INTERVAL` overrides `delivery.drain_interval_seconds`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies `MRTRACE_*` overrides read through `var`.
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(endpoint) = var("MRTRACE_LRS_ENDPOINT") {
        config.lrs.endpoint = endpoint;
    }
    if let Some(username) = var("MRTRACE_LRS_USERNAME") {
        config.lrs.username = username;
    }
    if let Some(password) = var("MRTRACE_LRS_PASSWORD") {
        config.lrs.password = password;
    }
    if let Some(db_path) = var("MRTRACE_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = var("MRTRACE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("MRTRACE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(interval) = var("MRTRACE_DRAIN_INTERVAL") {
        if let Ok(parsed) = interval.parse() {
            config.delivery.drain_interval_seconds = parsed;
        }
    }
}
