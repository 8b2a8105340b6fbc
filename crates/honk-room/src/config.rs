//! Room configuration and the per-connection state machine.

use std::time::Duration;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room a [`RoomManager`](crate::RoomManager)
/// spawns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    /// Shortest accepted display name, in characters.
    pub min_name_len: usize,

    /// Capacity of the room actor's command channel.
    pub channel_size: usize,

    /// Stop the room after this long with nobody in it and no commands.
    /// `None` keeps empty rooms alive for the life of the process.
    pub idle_timeout: Option<Duration>,

    /// Reap sessions created by `join` that never got a socket or a
    /// subscriber within this window. `None` disables reaping.
    pub unclaimed_join_ttl: Option<Duration>,

    /// How often the room checks for idleness and unclaimed joins.
    pub sweep_interval: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_name_len: 3,
            channel_size: 64,
            idle_timeout: Some(Duration::from_secs(300)),
            unclaimed_join_ttl: Some(Duration::from_secs(60)),
            sweep_interval: Duration::from_secs(5),
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// Lifecycle of one socket connection.
///
/// Transitions are strictly ordered:
///
/// ```text
/// Connecting → Unnamed → Named → Closed
/// ```
///
/// - **Connecting**: the upgrade handshake is in progress.
/// - **Unnamed**: the socket is open but has not entered; the room does
///   not know about it and it receives no broadcasts.
/// - **Named**: an `enter` was accepted. The connection is a session in
///   the room and receives every broadcast.
/// - **Closed**: the socket is gone and its session (if any) removed.
///
/// A connection may also close straight from `Connecting` or `Unnamed`;
/// see [`can_close`](Self::can_close).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Unnamed,
    Named,
    Closed,
}

impl ConnectionState {
    /// Returns `true` if the connection has a session in the room.
    pub fn is_named(&self) -> bool {
        matches!(self, Self::Named)
    }

    /// The next state on the happy path, or `None` from `Closed`.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Connecting => Some(Self::Unnamed),
            Self::Unnamed => Some(Self::Named),
            Self::Named => Some(Self::Closed),
            Self::Closed => None,
        }
    }

    /// Any open connection can close, named or not.
    pub fn can_close(self) -> bool {
        self != Self::Closed
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Unnamed => write!(f, "Unnamed"),
            Self::Named => write!(f, "Named"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_next_follows_strict_order() {
        assert_eq!(
            ConnectionState::Connecting.next(),
            Some(ConnectionState::Unnamed)
        );
        assert_eq!(
            ConnectionState::Unnamed.next(),
            Some(ConnectionState::Named)
        );
        assert_eq!(
            ConnectionState::Named.next(),
            Some(ConnectionState::Closed)
        );
        assert_eq!(ConnectionState::Closed.next(), None);
    }

    #[test]
    fn test_connection_state_any_open_state_can_close() {
        assert!(ConnectionState::Connecting.can_close());
        assert!(ConnectionState::Unnamed.can_close());
        assert!(ConnectionState::Named.can_close());
        assert!(!ConnectionState::Closed.can_close());
    }

    #[test]
    fn test_connection_state_is_named() {
        assert!(!ConnectionState::Connecting.is_named());
        assert!(!ConnectionState::Unnamed.is_named());
        assert!(ConnectionState::Named.is_named());
        assert!(!ConnectionState::Closed.is_named());
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Unnamed.to_string(), "Unnamed");
        assert_eq!(ConnectionState::Closed.to_string(), "Closed");
    }

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.min_name_len, 3);
        assert_eq!(config.channel_size, 64);
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(300)));
        assert_eq!(config.unclaimed_join_ttl, Some(Duration::from_secs(60)));
    }
}
