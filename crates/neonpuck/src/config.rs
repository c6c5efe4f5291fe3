//! Server configuration from the process environment.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `PORT` | listen on `0.0.0.0:$PORT` (wins over `NEONPUCK_ADDR`) | |
//! | `NEONPUCK_ADDR` | full bind address | `0.0.0.0:3000` |
//! | `LOG_LEVEL` | fallback filter when `RUST_LOG` is unset | `info` |
//! | `NEONPUCK_CLEANUP_GRACE_MS` | how long an empty room survives | `30000` |
//! | `NEONPUCK_HANDSHAKE_TIMEOUT_MS` | deadline for the WebSocket upgrade | `5000` |

use std::net::SocketAddr;
use std::time::Duration;

use neonpuck_room::MatchConfig;

use crate::DEFAULT_HANDSHAKE_TIMEOUT;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub match_config: MatchConfig,
    pub handshake_timeout: Duration,
}

impl ServerConfig {
    /// Reads the configuration from environment variables. Call
    /// `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable
    /// source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port.trim()),
            None => lookup("NEONPUCK_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string()),
        };
        let bind_addr = addr
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(addr.clone()))?;

        let log_level = lookup("LOG_LEVEL")
            .map(|level| level.trim().to_string())
            .filter(|level| !level.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let mut match_config = MatchConfig::default();
        if let Some(grace) = millis(&lookup, "NEONPUCK_CLEANUP_GRACE_MS")? {
            match_config.cleanup_grace = grace;
        }
        let handshake_timeout =
            millis(&lookup, "NEONPUCK_HANDSHAKE_TIMEOUT_MS")?.unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT);

        Ok(Self {
            bind_addr,
            log_level,
            match_config,
            handshake_timeout,
        })
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let ms: u64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value: raw.clone() })?;
    Ok(Some(Duration::from_millis(ms)))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid bind address: {0}")]
    InvalidAddress(String),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}
