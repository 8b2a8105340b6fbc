//! Server configuration.
//!
//! Loaded from environment variables, with defaults for everything.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use honk_room::RoomConfig;
use thiserror::Error;

/// Default socket listener address.
pub const DEFAULT_WS_BIND: &str = "0.0.0.0:8787";

/// Default HTTP listener address.
pub const DEFAULT_HTTP_BIND: &str = "0.0.0.0:8788";

/// Room used when a request names none.
pub const DEFAULT_ROOM: &str = "singleroom";

/// Default leaderboard request timeout in seconds.
pub const DEFAULT_LEADERBOARD_TIMEOUT_SECS: u64 = 5;

/// Default idle time before an empty room stops, in seconds.
pub const DEFAULT_ROOM_IDLE_SECS: u64 = 300;

/// Default lifetime of a join that never subscribed, in seconds.
pub const DEFAULT_JOIN_TTL_SECS: u64 = 60;

/// Honk server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Socket listener address (`HONK_WS_BIND`).
    pub ws_bind: String,

    /// HTTP listener address (`HONK_HTTP_BIND`).
    pub http_bind: String,

    /// Room for requests without `?room=` (`HONK_DEFAULT_ROOM`).
    pub default_room: String,

    /// Leaderboard collaborator endpoint (`HONK_LEADERBOARD_URL`).
    /// `None` means this server's own `/leaderboard`.
    pub leaderboard_url: Option<String>,

    /// Timeout for one leaderboard request (`HONK_LEADERBOARD_TIMEOUT_SECS`).
    pub leaderboard_timeout: Duration,

    /// Idle eviction for empty rooms (`HONK_ROOM_IDLE_SECS`, 0 disables).
    pub room_idle: Option<Duration>,

    /// Reaping of unclaimed joins (`HONK_JOIN_TTL_SECS`, 0 disables).
    pub join_ttl: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ws_bind: DEFAULT_WS_BIND.to_string(),
            http_bind: DEFAULT_HTTP_BIND.to_string(),
            default_room: DEFAULT_ROOM.to_string(),
            leaderboard_url: None,
            leaderboard_timeout: Duration::from_secs(
                DEFAULT_LEADERBOARD_TIMEOUT_SECS,
            ),
            room_idle: Some(Duration::from_secs(DEFAULT_ROOM_IDLE_SECS)),
            join_ttl: Some(Duration::from_secs(DEFAULT_JOIN_TTL_SECS)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid number in {0}: {1}")]
    InvalidNumber(String, String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let ws_bind = vars
            .get("HONK_WS_BIND")
            .cloned()
            .unwrap_or(defaults.ws_bind);

        let http_bind = vars
            .get("HONK_HTTP_BIND")
            .cloned()
            .unwrap_or(defaults.http_bind);

        let default_room = vars
            .get("HONK_DEFAULT_ROOM")
            .cloned()
            .unwrap_or(defaults.default_room);
        if default_room.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "HONK_DEFAULT_ROOM".to_string(),
                "must not be empty".to_string(),
            ));
        }

        // An empty URL is treated like an unset one.
        let leaderboard_url = vars
            .get("HONK_LEADERBOARD_URL")
            .filter(|url| !url.trim().is_empty())
            .cloned();

        let timeout_secs = parse_secs(
            vars,
            "HONK_LEADERBOARD_TIMEOUT_SECS",
            DEFAULT_LEADERBOARD_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "HONK_LEADERBOARD_TIMEOUT_SECS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        let room_idle =
            parse_secs(vars, "HONK_ROOM_IDLE_SECS", DEFAULT_ROOM_IDLE_SECS)?;
        let join_ttl =
            parse_secs(vars, "HONK_JOIN_TTL_SECS", DEFAULT_JOIN_TTL_SECS)?;

        Ok(Self {
            ws_bind,
            http_bind,
            default_room,
            leaderboard_url,
            leaderboard_timeout: Duration::from_secs(timeout_secs),
            room_idle: nonzero_secs(room_idle),
            join_ttl: nonzero_secs(join_ttl),
        })
    }

    /// Settings for every room this server spawns.
    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            idle_timeout: self.room_idle,
            unclaimed_join_ttl: self.join_ttl,
            ..RoomConfig::default()
        }
    }
}

fn parse_secs(
    vars: &HashMap<String, String>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match vars.get(key) {
        Some(value) => value.trim().parse().map_err(|e| {
            ConfigError::InvalidNumber(
                key.to_string(),
                format!("expected whole seconds, got '{value}': {e}"),
            )
        }),
        None => Ok(default),
    }
}

fn nonzero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
