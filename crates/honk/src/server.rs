//! `HonkServer` builder and server loop.
//!
//! This is the entry point for running a honk server. It ties together
//! all the layers: transport → protocol → session → room, plus the HTTP
//! surface served next to the socket listener.

use std::future::Future;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use honk_protocol::JsonCodec;
use honk_room::{RoomHandle, RoomManager};
use honk_transport::{Transport, WebSocketTransport};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

use crate::handler::handle_connection;
use crate::http::build_routes;
use crate::{Config, HonkError, HttpLeaderboard, LeaderboardStore};

/// Shared server state passed to each connection handler and route.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState {
    pub(crate) rooms: Mutex<RoomManager<HttpLeaderboard>>,
    pub(crate) codec: JsonCodec,
    pub(crate) default_room: String,
    pub(crate) leaderboard: LeaderboardStore,
}

impl ServerState {
    /// The room named `requested`, or the default room.
    pub(crate) async fn room(&self, requested: Option<&str>) -> RoomHandle {
        let name = requested
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.default_room);
        self.rooms.lock().await.room(name)
    }
}

/// Builder for configuring and starting a honk server.
///
/// # Example
///
/// ```rust,no_run
/// use honk::prelude::*;
///
/// # async fn run() -> Result<(), HonkError> {
/// let server = HonkServer::builder(Config::from_env()?).build().await?;
/// server.run().await
/// # }
/// ```
pub struct HonkServerBuilder {
    config: Config,
}

impl HonkServerBuilder {
    /// Creates a builder for `config`.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Binds both listeners and prepares the shared state.
    ///
    /// Without a configured leaderboard URL, sounds are recorded into this
    /// server's own `/leaderboard` endpoint.
    pub async fn build(self) -> Result<HonkServer, HonkError> {
        let config = self.config;
        let transport = WebSocketTransport::bind(&config.ws_bind).await?;
        let listener = TcpListener::bind(&config.http_bind).await?;

        let leaderboard_url = match &config.leaderboard_url {
            Some(url) => url.clone(),
            None => format!(
                "http://{}/leaderboard",
                reachable(listener.local_addr()?)
            ),
        };
        let leaderboard =
            HttpLeaderboard::new(leaderboard_url, config.leaderboard_timeout)?;
        tracing::info!(url = %leaderboard.url(), "leaderboard collaborator");

        let state = Arc::new(ServerState {
            rooms: Mutex::new(RoomManager::new(
                config.room_config(),
                Arc::new(leaderboard),
            )),
            codec: JsonCodec,
            default_room: config.default_room,
            leaderboard: LeaderboardStore::new(),
        });

        Ok(HonkServer {
            transport,
            listener,
            state,
        })
    }
}

/// Maps a wildcard bind address to loopback so the server can call itself.
fn reachable(addr: SocketAddr) -> SocketAddr {
    match addr {
        SocketAddr::V4(v4) if v4.ip().is_unspecified() => {
            SocketAddr::new(Ipv4Addr::LOCALHOST.into(), v4.port())
        }
        SocketAddr::V6(v6) if v6.ip().is_unspecified() => {
            SocketAddr::new(Ipv6Addr::LOCALHOST.into(), v6.port())
        }
        other => other,
    }
}

/// A bound honk server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct HonkServer {
    transport: WebSocketTransport,
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl HonkServer {
    /// Creates a new builder.
    pub fn builder(config: Config) -> HonkServerBuilder {
        HonkServerBuilder::new(config)
    }

    /// Returns the address the socket listener is bound to.
    pub fn ws_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns the address the HTTP listener is bound to.
    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs until the process is terminated.
    pub async fn run(self) -> Result<(), HonkError> {
        self.run_until(std::future::pending()).await
    }

    /// Serves HTTP and accepts sockets until `shutdown` resolves, then
    /// stops every room and waits for the HTTP server to drain.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), HonkError>
    where
        F: Future<Output = ()> + Send,
    {
        let HonkServer {
            mut transport,
            listener,
            state,
        } = self;

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let app = build_routes(Arc::clone(&state));
        let http = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        tracing::info!("honk server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("honk server shutting down");
        transport.shutdown().await?;
        // Ending the rooms ends every event stream, so the HTTP drain
        // can finish.
        state.rooms.lock().await.shutdown_all().await;
        let _ = stop_tx.send(());
        match http.await {
            Ok(result) => result?,
            Err(e) => tracing::error!(error = %e, "http server task failed"),
        }
        tracing::info!("honk server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reachable_maps_wildcard_to_loopback() {
        let addr: SocketAddr = "0.0.0.0:8788".parse().unwrap();
        assert_eq!(reachable(addr), "127.0.0.1:8788".parse().unwrap());

        let addr: SocketAddr = "[::]:8788".parse().unwrap();
        assert_eq!(reachable(addr), "[::1]:8788".parse().unwrap());
    }

    #[test]
    fn test_reachable_keeps_concrete_address() {
        let addr: SocketAddr = "10.0.0.7:8788".parse().unwrap();
        assert_eq!(reachable(addr), addr);
    }
}
