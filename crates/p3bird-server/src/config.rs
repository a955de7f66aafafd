//! Server configuration loading from file and environment variables.

use p3bird_db::PoolConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Connection pool settings, passed to [`p3bird_db::create_pool`].
    #[serde(default = "default_database")]
    pub database: PoolConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "p3bird_orm=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    9000
}

fn default_database() -> PoolConfig {
    PoolConfig {
        host: "127.0.0.1".to_string(),
        ..PoolConfig::new("www-data", "", "p3bird.db")
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: default_database(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
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
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Config file read when neither the command line nor the environment names one.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Picks the config file: the first command-line argument, then
/// `P3BIRD_CONFIG_PATH`, then [`DEFAULT_CONFIG_PATH`]. Blank values are
/// skipped. Returns the path and which of the three supplied it.
pub fn resolve_config_path(
    cli_arg: Option<String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> (String, &'static str) {
    let non_blank = |value: &String| !value.trim().is_empty();
    if let Some(path) = cli_arg.filter(non_blank) {
        return (path, "cli-arg");
    }
    if let Some(path) = lookup("P3BIRD_CONFIG_PATH").filter(non_blank) {
        return (path, "env-var");
    }
    (DEFAULT_CONFIG_PATH.to_string(), "default")
}

/// Loads configuration from a TOML file, falling back to defaults when the
/// file does not exist.
///
/// Environment variable overrides:
/// - `P3BIRD_HOST` overrides `server.host`
/// - `P3BIRD_PORT` overrides `server.port`
/// - `P3BIRD_DB` overrides `database.db`
/// - `P3BIRD_DB_USER` overrides `database.user`
/// - `P3BIRD_DB_PASSWORD` overrides `database.password`
/// - `P3BIRD_DB_MAX_SIZE` overrides `database.max_size`
/// - `P3BIRD_LOG_LEVEL` overrides `logging.level`
/// - `P3BIRD_LOG_JSON` overrides `logging.json` ("true" or "1" enables it)
///
/// Values that fail to parse are ignored.
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

/// Applies the `P3BIRD_*` overrides, reading variables through `lookup`.
fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(parsed) = lookup("P3BIRD_HOST").and_then(|v| v.parse().ok()) {
        config.server.host = parsed;
    }
    if let Some(parsed) = lookup("P3BIRD_PORT").and_then(|v| v.parse().ok()) {
        config.server.port = parsed;
    }
    if let Some(db) = lookup("P3BIRD_DB") {
        config.database.db = db;
    }
    if let Some(user) = lookup("P3BIRD_DB_USER") {
        config.database.user = user;
    }
    if let Some(password) = lookup("P3BIRD_DB_PASSWORD") {
        config.database.password = password;
    }
    if let Some(parsed) = lookup("P3BIRD_DB_MAX_SIZE").and_then(|v| v.parse().ok()) {
        config.database.max_size = parsed;
    }
    if let Some(level) = lookup("P3BIRD_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("P3BIRD_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
