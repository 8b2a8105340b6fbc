//! Session types: the record binding an account to a transport.
//!
//! A session tracks:
//! - WHO the participant is (`Account`)
//! - WHEN the session was created (for reaping unclaimed joins)
//! - HOW to push to them, if they have a socket attached

use std::time::Duration;

use honk_protocol::{Account, AccountId, ServerMessage};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Push channel to a socket connection's writer.
///
/// Unbounded so the room never waits on a slow client; a closed channel
/// means the connection is already gone and sends are dropped.
pub type SocketSender = mpsc::UnboundedSender<ServerMessage>;

/// A participant registered in a room.
///
/// Sessions created by a socket `enter` carry a [`SocketSender`]. Sessions
/// created by a request/response `join` have none until the participant
/// attaches some other transport (a subscription) under the same account.
#[derive(Debug, Clone)]
pub struct Session {
    /// The participant this session belongs to.
    pub account: Account,

    /// When the session was registered. Uses tokio's clock so paused-time
    /// tests can move it.
    pub created_at: Instant,

    /// Push channel for socket-backed sessions.
    pub socket: Option<SocketSender>,
}

impl Session {
    /// A session backed by a live socket.
    pub fn with_socket(account: Account, socket: SocketSender) -> Self {
        Self {
            account,
            created_at: Instant::now(),
            socket: Some(socket),
        }
    }

    /// A session with no push channel (request/response join).
    pub fn detached(account: Account) -> Self {
        Self {
            account,
            created_at: Instant::now(),
            socket: None,
        }
    }

    /// Returns `true` if this session can receive pushed events.
    pub fn has_socket(&self) -> bool {
        self.socket.is_some()
    }

    /// Time since the session was registered.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Creates an account with a fresh id. `name` may be empty for a socket
/// that has not entered yet.
pub fn new_account(name: impl Into<String>) -> Account {
    Account {
        id: generate_account_id(),
        name: name.into(),
    }
}

/// Generates a random 32-character hex account id (128 bits).
pub fn generate_account_id() -> AccountId {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    AccountId::new(bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_account_id_is_32_hex_chars() {
        let id = generate_account_id();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_account_id_is_unique() {
        assert_ne!(generate_account_id(), generate_account_id());
    }

    #[test]
    fn test_new_account_starts_with_given_name() {
        assert_eq!(new_account("amy").name, "amy");
        assert!(!new_account("").is_named());
    }

    #[test]
    fn test_detached_session_has_no_socket() {
        let session = Session::detached(new_account("amy"));
        assert!(!session.has_socket());
    }

    #[tokio::test]
    async fn test_socket_session_pushes_to_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::with_socket(new_account("bob"), tx);
        assert!(session.has_socket());

        let msg = ServerMessage::from(honk_protocol::ErrorCode::InvalidName);
        session.socket.as_ref().unwrap().send(msg.clone()).unwrap();
        assert_eq!(rx.recv().await, Some(msg));
    }
}
