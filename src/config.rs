use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{self, LobbyError, LobbyResult};
use crate::events::DEFAULT_LOG_HISTORY_CAPACITY;

// Default configuration values
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8888;
const DEFAULT_MAX_CONNECTIONS: usize = 100;
const DEFAULT_TIMEOUT_SECONDS: u64 = 300;
const DEFAULT_PING_INTERVAL_SECONDS: u64 = 60;
/// Upper bound for ping interval and idle timeout, keeps deadlines representable
const MAX_DURATION_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listening endpoint configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Log history observer configuration
    #[serde(default)]
    pub event_log: EventLogConfig,
}

/// Listening endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to, 0 picks a free port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Host name announced to observers, derived from `host` when unset
    #[serde(default = "default_advertised_host")]
    pub advertised_host: Option<String>,
    /// Maximum number of simultaneous sessions
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Inactivity timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Ping interval in seconds
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    /// Whether to allow cross-origin requests
    #[serde(default = "default_cors_enabled")]
    pub cors_enabled: bool,
}

/// Log history observer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogConfig {
    /// Number of log entries kept, oldest dropped first
    #[serde(default = "default_log_capacity")]
    pub capacity: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(fallback)
}

fn default_host() -> String {
    std::env::var("LOBBY_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string())
}

fn default_port() -> u16 {
    env_or("LOBBY_PORT", DEFAULT_PORT)
}

fn default_advertised_host() -> Option<String> {
    std::env::var("LOBBY_ADVERTISED_HOST").ok()
}

pub fn default_max_connections() -> usize {
    env_or("LOBBY_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)
}

pub fn default_timeout() -> u64 {
    env_or("LOBBY_TIMEOUT_SECONDS", DEFAULT_TIMEOUT_SECONDS)
}

pub fn default_ping_interval() -> u64 {
    env_or("LOBBY_PING_INTERVAL", DEFAULT_PING_INTERVAL_SECONDS)
}

fn default_cors_enabled() -> bool {
    env_or("LOBBY_CORS_ENABLED", true)
}

fn default_log_capacity() -> usize {
    env_or("LOBBY_LOG_CAPACITY", DEFAULT_LOG_HISTORY_CAPACITY)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            advertised_host: default_advertised_host(),
            max_connections: default_max_connections(),
            timeout_seconds: default_timeout(),
            ping_interval: default_ping_interval(),
            cors_enabled: default_cors_enabled(),
        }
    }
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            capacity: default_log_capacity(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Prefix the HTTP surface is served under
    pub fn url_prefix(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }

    /// Host announced to observers. Wildcard binds announce `localhost`.
    pub fn advertised_host(&self) -> String {
        match &self.advertised_host {
            Some(host) if !host.is_empty() => host.clone(),
            _ if self.host == "0.0.0.0" || self.host == "::" || self.host == "*" => {
                "localhost".to_string()
            }
            _ => self.host.clone(),
        }
    }
}

impl ServerConfig {
    /// Reject values the server cannot run with
    pub fn validate(&self) -> LobbyResult<()> {
        if self.max_connections == 0 {
            return Err(error::config_invalid(
                "server.max_connections",
                "0",
                "at least one connection must be allowed",
            ));
        }
        check_duration("server.ping_interval", self.ping_interval)?;
        check_duration("server.timeout_seconds", self.timeout_seconds)?;
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> LobbyResult<()> {
        self.server.validate()
    }
}

fn check_duration(key: &str, seconds: u64) -> LobbyResult<()> {
    if seconds == 0 || seconds > MAX_DURATION_SECONDS {
        return Err(error::config_invalid(
            key,
            &seconds.to_string(),
            &format!("must be between 1 and {} seconds", MAX_DURATION_SECONDS),
        ));
    }
    Ok(())
}

/// Load the configuration named by `LOBBY_CONFIG_PATH`, or defaults
pub async fn load_config() -> LobbyResult<Config> {
    match std::env::var("LOBBY_CONFIG_PATH") {
        Ok(path) => load_config_from(Path::new(&path)).await,
        Err(_) => {
            debug!("LOBBY_CONFIG_PATH not set, using default configuration");
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Load configuration from a JSON file, falling back to defaults if it is missing
pub async fn load_config_from(path: &Path) -> LobbyResult<Config> {
    if !path.exists() {
        info!("No configuration at {}, using defaults", path.display());
        let config = Config::default();
        config.validate()?;
        return Ok(config);
    }

    let config_str = fs::read_to_string(path).await.map_err(|e| {
        LobbyError::from(anyhow::anyhow!("Failed to read {}: {}", path.display(), e))
    })?;
    let config: Config = serde_json::from_str(&config_str).map_err(|e| {
        error::config_invalid(&path.display().to_string(), "<file>", &e.to_string())
    })?;
    config.validate()?;
    debug!("Loaded configuration from {}", path.display());

    Ok(config)
}
