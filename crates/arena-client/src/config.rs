//! Client configuration.
//!
//! Loaded from a TOML file, then overridden by `ARENA_*` environment
//! variables, then by CLI flags. Validation runs once after all layers are
//! applied.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// Raw TOML layout
// ============================================================================

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    bootstrap: RawBootstrap,
    #[serde(default)]
    connection: RawConnection,
    #[serde(default)]
    auth: RawAuth,
    #[serde(default)]
    log: RawLog,
}

#[derive(Debug, Deserialize, Default)]
struct RawServer {
    url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawBootstrap {
    username: Option<String>,
    initial_capital: Option<Decimal>,
}

#[derive(Debug, Deserialize, Default)]
struct RawConnection {
    reconnect_delay_ms: Option<u64>,
    connect_retry_delay_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct RawAuth {
    token_path: Option<PathBuf>,
    ttl_hours: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct RawLog {
    level: Option<String>,
}

// ============================================================================
// Resolved config
// ============================================================================

/// Bootstrap identity sent on every connection establishment.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub username: String,
    pub initial_capital: Decimal,
}

/// Connection timing knobs.
#[derive(Debug, Clone)]
pub struct ConnectionTuning {
    /// Delay before reconnecting after an abnormal close.
    pub reconnect_delay: Duration,
    /// Delay before retrying when the connection cannot be established.
    pub connect_retry_delay: Duration,
    /// Handshake timeout.
    pub connect_timeout: Duration,
}

/// Trade-confirmation token settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Where the cached session token lives on disk.
    pub token_path: PathBuf,
    /// Token lifetime.
    pub ttl: Duration,
}

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// HTTP base URL of the venue, e.g. `http://localhost:8080`.
    pub server_url: String,
    pub log_level: String,
    pub bootstrap: BootstrapConfig,
    pub connection: ConnectionTuning,
    pub auth: AuthConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            log_level: "info".to_string(),
            bootstrap: BootstrapConfig {
                username: "default".to_string(),
                initial_capital: Decimal::from(10_000),
            },
            connection: ConnectionTuning {
                reconnect_delay: Duration::from_millis(3_000),
                connect_retry_delay: Duration::from_millis(5_000),
                connect_timeout: Duration::from_millis(10_000),
            },
            auth: AuthConfig {
                token_path: PathBuf::from(".arena/session_token.json"),
                ttl: Duration::from_secs(24 * 3600),
            },
        }
    }
}

impl ClientConfig {
    /// Load from a TOML file and apply environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse from TOML text. Missing sections fall back to defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(raw)?;
        let mut config = Self::default();

        if let Some(url) = raw.server.url {
            config.server_url = url;
        }
        if let Some(level) = raw.log.level {
            config.log_level = level;
        }
        if let Some(username) = raw.bootstrap.username {
            config.bootstrap.username = username;
        }
        if let Some(capital) = raw.bootstrap.initial_capital {
            config.bootstrap.initial_capital = capital;
        }
        if let Some(ms) = raw.connection.reconnect_delay_ms {
            config.connection.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = raw.connection.connect_retry_delay_ms {
            config.connection.connect_retry_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = raw.connection.connect_timeout_ms {
            config.connection.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(path) = raw.auth.token_path {
            config.auth.token_path = path;
        }
        if let Some(hours) = raw.auth.ttl_hours {
            config.auth.ttl = Duration::from_secs(hours * 3600);
        }

        Ok(config)
    }

    /// Environment variables win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("ARENA_SERVER_URL") {
            self.server_url = url;
        }
        if let Ok(level) = std::env::var("ARENA_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(username) = std::env::var("ARENA_USERNAME") {
            self.bootstrap.username = username;
        }
        if let Ok(path) = std::env::var("ARENA_TOKEN_PATH") {
            self.auth.token_path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "server url must be http(s), got {}",
                self.server_url
            )));
        }
        if self.bootstrap.username.is_empty() {
            return Err(ConfigError::Invalid("bootstrap username is empty".into()));
        }
        if self.bootstrap.initial_capital <= Decimal::ZERO {
            return Err(ConfigError::Invalid(
                "bootstrap initial_capital must be positive".into(),
            ));
        }
        if self.connection.connect_timeout.is_zero() {
            return Err(ConfigError::Invalid("connect_timeout must be non-zero".into()));
        }
        Ok(())
    }
}
