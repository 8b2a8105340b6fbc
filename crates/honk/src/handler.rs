//! Per-connection socket handler: decode client messages, drive the room,
//! and forward room pushes back down the socket.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Pick the room from the upgrade request's `?room=` query
//!   2. Loop: client frames → `enter` / `sound`; room pushes → socket
//!   3. On close or error, a drop guard disconnects from the room

use std::sync::Arc;

use honk_protocol::{
    Account, AccountId, ClientMessage, Codec, ErrorCode, ServerMessage,
};
use honk_room::{ConnectionState, RoomHandle};
use honk_session::generate_account_id;
use honk_transport::{Connection, ConnectionId, WebSocketConnection};
use reqwest::Url;
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::HonkError;

/// Drop guard that disconnects the connection's session when the handler
/// exits, including on panic. `Drop` is synchronous, so the room call runs
/// as a fire-and-forget task.
struct DisconnectGuard {
    room: RoomHandle,
    account_id: AccountId,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let room = self.room.clone();
        let account_id = self.account_id.clone();
        tokio::spawn(async move {
            let _ = room.disconnect(account_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), HonkError> {
    let conn_id = conn.id();
    let mut conn_state = ConnectionState::Connecting;

    let room = state.room(room_from_uri(conn.request_target()).as_deref()).await;
    conn_state = advance(conn_id, conn_state);
    tracing::debug!(%conn_id, room = %room.name(), "handling new connection");

    let account_id = generate_account_id();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let _guard = DisconnectGuard {
        room: room.clone(),
        account_id: account_id.clone(),
    };
    let mut entered: Option<Account> = None;

    loop {
        tokio::select! {
            incoming = conn.recv() => {
                let data = match incoming {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::debug!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                };

                let msg: ClientMessage = match state.codec.decode(&data) {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "malformed event, closing");
                        let _ = send(&conn, &state, ErrorCode::MalformedEvent.into()).await;
                        let _ = conn.close().await;
                        break;
                    }
                };

                match msg {
                    ClientMessage::Enter { name } => {
                        if conn_state.is_named() {
                            send(&conn, &state, ErrorCode::AlreadyEntered.into()).await?;
                            continue;
                        }
                        match room.enter(account_id.clone(), name, outbound_tx.clone()).await {
                            Ok(account) => {
                                conn_state = advance(conn_id, conn_state);
                                entered = Some(account);
                            }
                            Err(e) => match e.code() {
                                Some(code) => send(&conn, &state, code.into()).await?,
                                None => return Err(e.into()),
                            },
                        }
                    }
                    ClientMessage::Sound { name } => match &entered {
                        Some(account) => room.sound(name, account.name.clone()).await?,
                        None => send(&conn, &state, ErrorCode::NotEntered.into()).await?,
                    },
                }
            }
            outbound = outbound_rx.recv() => {
                let Some(msg) = outbound else { break };
                if let Err(e) = send(&conn, &state, msg).await {
                    tracing::debug!(%conn_id, error = %e, "send failed");
                    break;
                }
            }
        }
    }

    close_state(conn_id, conn_state);
    if let Some(account) = entered {
        tracing::info!(%conn_id, account_id = %account.id, name = %account.name, "socket left");
    }
    // _guard drops here → room disconnect fires.
    Ok(())
}

/// One step along `Connecting → Unnamed → Named`.
fn advance(conn_id: ConnectionId, from: ConnectionState) -> ConnectionState {
    let to = from.next().unwrap_or(ConnectionState::Closed);
    tracing::debug!(%conn_id, %from, %to, "connection state");
    to
}

fn close_state(conn_id: ConnectionId, from: ConnectionState) {
    debug_assert!(from.can_close(), "{from} cannot close");
    tracing::debug!(%conn_id, %from, to = %ConnectionState::Closed, "connection state");
}

async fn send(
    conn: &WebSocketConnection,
    state: &ServerState,
    msg: ServerMessage,
) -> Result<(), HonkError> {
    let bytes = state.codec.encode(&msg)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Reads `room` from the request target's query string.
fn room_from_uri(uri: &str) -> Option<String> {
    let url = Url::parse("ws://localhost").ok()?.join(uri).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "room")
        .map(|(_, value)| value.into_owned())
        .filter(|room| !room.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_from_uri_reads_room_param() {
        assert_eq!(room_from_uri("/?room=pond").as_deref(), Some("pond"));
        assert_eq!(
            room_from_uri("/ws?x=1&room=big%20lake").as_deref(),
            Some("big lake")
        );
    }

    #[test]
    fn test_room_from_uri_missing_or_empty_is_none() {
        assert_eq!(room_from_uri("/"), None);
        assert_eq!(room_from_uri("/?room="), None);
        assert_eq!(room_from_uri("/?other=pond"), None);
    }
}
