//! Server settings: a TOML file plus `COOKBOOK_*` environment overrides.

use cookbook_db::PoolSettings;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

/// Config file used when `COOKBOOK_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "cookbook.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite file holding the recipes table; created on first start.
    pub path: String,
    pub busy_timeout_ms: u64,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let pool = PoolSettings::default();
        Self {
            path: "recipes.db".to_string(),
            busy_timeout_ms: pool.busy_timeout.as_millis() as u64,
            max_connections: pool.max_connections,
        }
    }
}

impl DatabaseConfig {
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            max_connections: self.max_connections,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `"info"` or `"cookbook_recipes=debug,info"`.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("{var}={value:?} is not a valid value")]
    Env { var: &'static str, value: String },
}

/// Reads the config file named by `COOKBOOK_CONFIG` (or
/// [`DEFAULT_CONFIG_PATH`]) and applies environment overrides. A missing
/// file means defaults.
pub fn load() -> Result<Config, ConfigError> {
    let path = std::env::var("COOKBOOK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut config = from_file(&path)?;
    apply_overrides(&mut config, |var| std::env::var(var).ok())?;
    Ok(config)
}

fn from_file(path: &str) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(source) => Err(ConfigError::Read {
            path: path.to_string(),
            source,
        }),
    }
}

/// Overrides: `COOKBOOK_HOST`, `COOKBOOK_PORT`, `COOKBOOK_DB_PATH`,
/// `COOKBOOK_LOG_LEVEL`, `COOKBOOK_LOG_JSON`. Unparseable values are errors
/// rather than silently ignored.
fn apply_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    fn parse<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
        value.parse().map_err(|_| ConfigError::Env { var, value })
    }

    if let Some(v) = lookup("COOKBOOK_HOST") {
        config.server.host = parse("COOKBOOK_HOST", v)?;
    }
    if let Some(v) = lookup("COOKBOOK_PORT") {
        config.server.port = parse("COOKBOOK_PORT", v)?;
    }
    if let Some(v) = lookup("COOKBOOK_DB_PATH") {
        config.database.path = v;
    }
    if let Some(v) = lookup("COOKBOOK_LOG_LEVEL") {
        config.logging.level = v;
    }
    if let Some(v) = lookup("COOKBOOK_LOG_JSON") {
        config.logging.json = parse("COOKBOOK_LOG_JSON", v)?;
    }
    Ok(())
}
