//! Raw socket transport for honk.
//!
//! The socket shim in the server crate only sees the two traits here:
//! a [`Transport`] hands out [`Connection`]s, and each connection moves
//! opaque byte payloads. Framing and the room query live above this layer.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket listener via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SOCKET: AtomicU64 = AtomicU64::new(1);

/// Process-unique socket number, used to correlate log lines.
///
/// This is not the participant's account id: a socket exists before its
/// owner has entered a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next id. Ids start at 1 and only grow.
    pub fn next() -> Self {
        Self(NEXT_SOCKET.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sock-{}", self.0)
    }
}

/// Source of inbound sockets.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next socket and completes its handshake.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops accepting. Sockets already handed out stay open.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// One participant socket.
///
/// Reading and writing are locked separately: the handler parks in
/// [`recv`](Connection::recv) while room pushes go out through
/// [`send`](Connection::send).
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Next payload from the peer, or `Ok(None)` once it has closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    /// Path and query the peer connected with, e.g. `/?room=pond`.
    fn request_target(&self) -> &str;
}
