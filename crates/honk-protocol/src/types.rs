//! Wire types for honk rooms.
//!
//! Every type in this module travels over a socket, an HTTP body or an
//! event stream as JSON. The JSON shapes are fixed by the browser client,
//! so the serde attributes here are part of the contract.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Opaque, server-generated identity token for a participant.
///
/// Serialized as a bare string (`"3f9a..."`), never as an object.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Wraps an existing token, e.g. one echoed back by a client.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A participant in a room.
///
/// `name` starts empty for a socket that has not entered yet and is set
/// once the room accepts it. `id` never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
}

impl Account {
    /// Returns `true` once the account has been given a display name.
    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Messages a socket client may send.
///
/// `add`/`remove` are server-only and fail to decode here, which the
/// socket shim treats as a malformed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Ask to join the room under `name`.
    Enter { name: String },
    /// Play the sound called `name`. The sender is filled in server-side.
    Sound { name: String },
}

// ---------------------------------------------------------------------------
// Room events (broadcast)
// ---------------------------------------------------------------------------

/// An event fanned out to every participant of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RoomEvent {
    /// `from` played the sound `name`.
    Sound { name: String, from: String },
    /// `account` joined the room.
    Add { account: Account },
    /// `account` left the room.
    Remove { account: Account },
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Machine-readable error codes sent to a single client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Name shorter than the minimum or already taken.
    InvalidName,
    /// No subscriber with that account id.
    UnknownAccount,
    /// The connection already entered under a name.
    AlreadyEntered,
    /// The connection sent a sound before entering.
    NotEntered,
    /// Unparseable payload or unsupported `type`.
    MalformedEvent,
}

/// Replies addressed to exactly one connection, never broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerReply {
    /// The connection's `enter` was accepted. `accounts` holds everyone
    /// else currently in the room.
    Entered {
        accounts: Vec<Account>,
        #[serde(rename = "selfAccount")]
        self_account: Account,
    },
    /// The connection's last request was rejected.
    Error { code: ErrorCode },
}

/// Anything the server pushes down a socket.
///
/// Untagged on purpose: both inner enums already carry their own `type`
/// discriminator, so the outer layer adds nothing to the JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Event(RoomEvent),
    Reply(ServerReply),
}

impl From<RoomEvent> for ServerMessage {
    fn from(event: RoomEvent) -> Self {
        Self::Event(event)
    }
}

impl From<ServerReply> for ServerMessage {
    fn from(reply: ServerReply) -> Self {
        Self::Reply(reply)
    }
}

impl From<ErrorCode> for ServerMessage {
    fn from(code: ErrorCode) -> Self {
        Self::Reply(ServerReply::Error { code })
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The browser client parses these shapes directly, so each test pins
    //! the exact JSON rather than just checking that decode(encode(x)) == x.

    use super::*;
    use serde_json::json;

    fn account(id: &str, name: &str) -> Account {
        Account {
            id: AccountId::new(id),
            name: name.into(),
        }
    }

    #[test]
    fn test_account_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&AccountId::new("a1")).unwrap();
        assert_eq!(json, "\"a1\"");
    }

    #[test]
    fn test_account_is_named() {
        assert!(!account("a1", "").is_named());
        assert!(account("a1", "amy").is_named());
    }

    #[test]
    fn test_client_message_enter_decodes() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"enter","name":"amy"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Enter { name: "amy".into() });
    }

    #[test]
    fn test_client_message_sound_ignores_client_supplied_from() {
        // Clients cannot spoof the sender; unknown fields are dropped.
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"sound","name":"quack","from":"mallory"}"#,
        )
        .unwrap();
        assert_eq!(msg, ClientMessage::Sound { name: "quack".into() });
    }

    #[test]
    fn test_client_message_rejects_server_only_types() {
        let add = r#"{"type":"add","account":{"id":"a1","name":"amy"}}"#;
        assert!(serde_json::from_str::<ClientMessage>(add).is_err());
    }

    #[test]
    fn test_client_message_rejects_missing_type() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"name":"amy"}"#).is_err());
    }

    #[test]
    fn test_room_event_sound_json_format() {
        let event = RoomEvent::Sound {
            name: "quack".into(),
            from: "amy".into(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "sound", "name": "quack", "from": "amy"})
        );
    }

    #[test]
    fn test_room_event_add_and_remove_json_format() {
        let add = RoomEvent::Add { account: account("a1", "amy") };
        assert_eq!(
            serde_json::to_value(&add).unwrap(),
            json!({"type": "add", "account": {"id": "a1", "name": "amy"}})
        );

        let remove = RoomEvent::Remove { account: account("a2", "bob") };
        assert_eq!(
            serde_json::to_value(&remove).unwrap()["type"],
            "remove"
        );
    }

    #[test]
    fn test_server_message_event_has_no_extra_wrapping() {
        let msg = ServerMessage::from(RoomEvent::Sound {
            name: "honk".into(),
            from: "bob".into(),
        });
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "sound", "name": "honk", "from": "bob"})
        );
    }

    #[test]
    fn test_server_reply_entered_uses_self_account_key() {
        let msg = ServerMessage::from(ServerReply::Entered {
            accounts: vec![account("a1", "amy")],
            self_account: account("a2", "bob"),
        });
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "entered",
                "accounts": [{"id": "a1", "name": "amy"}],
                "selfAccount": {"id": "a2", "name": "bob"},
            })
        );
    }

    #[test]
    fn test_server_reply_error_code_is_screaming_snake() {
        let msg = ServerMessage::from(ErrorCode::InvalidName);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "error", "code": "INVALID_NAME"})
        );
        assert_eq!(
            serde_json::to_value(ErrorCode::MalformedEvent).unwrap(),
            "MALFORMED_EVENT"
        );
    }

    #[test]
    fn test_server_message_decodes_both_layers() {
        let event: ServerMessage = serde_json::from_str(
            r#"{"type":"remove","account":{"id":"a1","name":"amy"}}"#,
        )
        .unwrap();
        assert!(matches!(event, ServerMessage::Event(RoomEvent::Remove { .. })));

        let reply: ServerMessage =
            serde_json::from_str(r#"{"type":"error","code":"NOT_ENTERED"}"#)
                .unwrap();
        assert_eq!(reply, ServerMessage::from(ErrorCode::NotEntered));
    }
}
